use picture::ChromaFormat;

/// Sample ordering within one frame's on-disk bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// Each component stored as a full contiguous plane, in component order.
    Planar,
    /// Samples interleaved component-by-component within each pixel.
    Interleaved,
}

/// Fully-resolved geometry of a raw sequence file, derived from the
/// `FileFormat`/`PictureSize`/`BitDepth`/`ChromaFormat` configuration quad.
#[derive(Clone, Copy, Debug)]
pub struct SequenceLayout {
    pub width: usize,
    pub height: usize,
    pub bit_depth: u32,
    pub chroma: ChromaFormat,
    pub pixel_layout: PixelLayout,
    pub num_components: usize,
}

impl SequenceLayout {
    pub fn new(
        width: usize,
        height: usize,
        bit_depth: u32,
        chroma: ChromaFormat,
        pixel_layout: PixelLayout,
    ) -> Self {
        let num_components = match chroma {
            ChromaFormat::Mono400 => 1,
            ChromaFormat::Yuv420 | ChromaFormat::Yuv422 | ChromaFormat::Yuv444 => 3,
        };
        Self {
            width,
            height,
            bit_depth,
            chroma,
            pixel_layout,
            num_components,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        if self.bit_depth > 8 {
            2
        } else {
            1
        }
    }

    /// On-disk size (samples, not bytes) of component `c`, accounting for
    /// chroma subsampling. Luma (component 0) is always full resolution.
    pub fn plane_samples(&self, c: usize) -> (usize, usize) {
        if c == 0 {
            return (self.width, self.height);
        }
        match self.chroma {
            ChromaFormat::Mono400 => (0, 0),
            ChromaFormat::Yuv420 => (self.width.div_ceil(2), self.height.div_ceil(2)),
            ChromaFormat::Yuv422 => (self.width.div_ceil(2), self.height),
            ChromaFormat::Yuv444 => (self.width, self.height),
        }
    }

    /// Total bytes occupied by one frame on disk.
    pub fn frame_bytes(&self) -> usize {
        let bps = self.bytes_per_sample();
        (0..self.num_components)
            .map(|c| {
                let (w, h) = self.plane_samples(c);
                w * h * bps
            })
            .sum()
    }
}
