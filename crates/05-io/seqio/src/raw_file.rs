use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use picture::PicP;

use crate::error::{IoError, IoResult};
use crate::layout::{PixelLayout, SequenceLayout};

fn decode_samples(raw: &[u8], bytes_per_sample: usize) -> Vec<u16> {
    if bytes_per_sample == 1 {
        raw.iter().map(|&b| b as u16).collect()
    } else {
        raw.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect()
    }
}

/// Nearest-neighbor replication of a subsampled chroma plane up to the
/// luma's full resolution, matching `PicP`'s uniform-plane-size convention
/// (subsampling is metadata carried on [`picture::ChromaFormat`], not plane
/// geometry).
fn upsample_nearest(src: &[u16], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u16> {
    if src_w == dst_w && src_h == dst_h {
        return src.to_vec();
    }
    let x_ratio = (src_w.max(1)) as f64 / dst_w as f64;
    let y_ratio = (src_h.max(1)) as f64 / dst_h as f64;
    let mut out = vec![0u16; dst_w * dst_h];
    for y in 0..dst_h {
        let sy = ((y as f64 * y_ratio) as usize).min(src_h.saturating_sub(1));
        for x in 0..dst_w {
            let sx = ((x as f64 * x_ratio) as usize).min(src_w.saturating_sub(1));
            out[y * dst_w + x] = src[sy * src_w + sx];
        }
    }
    out
}

fn read_frame_into(
    file: &mut File,
    path: &str,
    layout: &SequenceLayout,
    frame_idx: usize,
    margin: usize,
) -> IoResult<PicP> {
    let frame_bytes = layout.frame_bytes();
    let offset = frame_idx as u64 * frame_bytes as u64;
    file.seek(SeekFrom::Start(offset)).map_err(|source| IoError::Open {
        path: path.to_string(),
        source,
    })?;

    let mut raw = vec![0u8; frame_bytes];
    let read = file.read(&mut raw).map_err(|source| IoError::Open {
        path: path.to_string(),
        source,
    })?;
    if read != frame_bytes {
        return Err(IoError::ShortRead {
            path: path.to_string(),
            expected: frame_bytes,
            got: read,
        });
    }

    let bps = layout.bytes_per_sample();
    let mut pic = PicP::new(
        layout.width,
        layout.height,
        layout.bit_depth,
        margin,
        layout.num_components,
        layout.chroma,
    );

    match layout.pixel_layout {
        PixelLayout::Planar => {
            let mut cursor = 0usize;
            for c in 0..layout.num_components {
                let (pw, ph) = layout.plane_samples(c);
                let plane_bytes = pw * ph * bps;
                let samples = decode_samples(&raw[cursor..cursor + plane_bytes], bps);
                cursor += plane_bytes;
                let full = upsample_nearest(&samples, pw, ph, layout.width, layout.height);
                for y in 0..layout.height {
                    for x in 0..layout.width {
                        pic.set(c, x, y, full[y * layout.width + x]);
                    }
                }
            }
        }
        PixelLayout::Interleaved => {
            // Interleaved raw sequences are always 4:4:4 (every component at
            // full resolution) by construction: subsampled components can't
            // share a per-pixel interleave stride.
            let samples = decode_samples(&raw, bps);
            for y in 0..layout.height {
                for x in 0..layout.width {
                    let base = (y * layout.width + x) * layout.num_components;
                    for c in 0..layout.num_components {
                        pic.set(c, x, y, samples[base + c]);
                    }
                }
            }
        }
    }

    pic.extend();
    Ok(pic)
}

/// One sequence's file handle plus its fixed layout, opened once and
/// reused across frame reads.
struct OpenSequence {
    path: PathBuf,
    file: File,
    layout: SequenceLayout,
    start_frame: usize,
}

impl OpenSequence {
    fn open(path: impl AsRef<Path>, layout: SequenceLayout, start_frame: usize) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| IoError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            path,
            file,
            layout,
            start_frame,
        })
    }

    fn read(&mut self, idx: usize, margin: usize) -> IoResult<PicP> {
        read_frame_into(&mut self.file, &self.path.display().to_string(), &self.layout, self.start_frame + idx, margin)
    }
}

/// Reads fixed-size planar or interleaved frames from disk, seeking to
/// `StartFrame + idx` per input.
pub struct RawFileSequenceIo {
    test: OpenSequence,
    reference: OpenSequence,
    mask: Option<OpenSequence>,
    margin: usize,
    num_frames: usize,
}

impl RawFileSequenceIo {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        test_path: impl AsRef<Path>,
        reference_path: impl AsRef<Path>,
        mask_path: Option<&Path>,
        layout: SequenceLayout,
        mask_layout: Option<SequenceLayout>,
        test_start_frame: usize,
        reference_start_frame: usize,
        margin: usize,
        num_frames: usize,
    ) -> IoResult<Self> {
        let test = OpenSequence::open(test_path, layout, test_start_frame)?;
        let reference = OpenSequence::open(reference_path, layout, reference_start_frame)?;
        let mask = match (mask_path, mask_layout) {
            (Some(path), Some(mask_layout)) => Some(OpenSequence::open(path, mask_layout, 0)?),
            _ => None,
        };
        Ok(Self {
            test,
            reference,
            mask,
            margin,
            num_frames,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }
}

impl crate::SequenceIO for RawFileSequenceIo {
    fn read_frame(&mut self, idx: usize) -> IoResult<crate::FrameSet> {
        if idx >= self.num_frames {
            return Err(IoError::OutOfRange {
                idx,
                start: 0,
                count: self.num_frames,
            });
        }
        let test = self.test.read(idx, self.margin)?;
        let reference = self.reference.read(idx, self.margin)?;
        let mask = match &mut self.mask {
            Some(mask) => Some(mask.read(idx, 0)?),
            None => None,
        };
        Ok(crate::FrameSet { test, reference, mask })
    }

    fn num_frames(&self) -> usize {
        self.num_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;
    use std::io::Write;

    fn write_planar_8bit(path: &Path, width: usize, height: usize, frames: &[u8]) {
        let mut file = File::create(path).unwrap();
        file.write_all(frames).unwrap();
        let _ = (width, height);
    }

    #[test]
    fn reads_planar_mono_frame_round_trip() {
        let dir = std::env::temp_dir().join(format!("qmiv-seqio-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.yuv");
        let pixels: Vec<u8> = (0..16u8).collect();
        write_planar_8bit(&path, 4, 4, &pixels);

        let layout = SequenceLayout::new(4, 4, 8, ChromaFormat::Mono400, PixelLayout::Planar);
        let mut seq = OpenSequence::open(&path, layout, 0).unwrap();
        let pic = seq.read(0, 0).unwrap();
        assert_eq!(pic.get(0, 0, 0), 0);
        assert_eq!(pic.get(0, 3, 3), 15);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_short_read() {
        let dir = std::env::temp_dir().join(format!("qmiv-seqio-short-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("short.yuv");
        std::fs::write(&path, vec![0u8; 4]).unwrap();

        let layout = SequenceLayout::new(4, 4, 8, ChromaFormat::Mono400, PixelLayout::Planar);
        let mut seq = OpenSequence::open(&path, layout, 0).unwrap();
        assert!(seq.read(0, 0).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
