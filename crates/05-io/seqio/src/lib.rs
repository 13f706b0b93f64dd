//! Raw picture sequence I/O: the `SequenceIO` collaborator.
//!
//! The metric core never touches a filesystem directly; it asks a
//! `SequenceIO` for the next `FrameSet`. [`RawFileSequenceIo`] reads
//! bit-exact planar/interleaved YCbCr/RGB files; [`InMemorySequenceIo`]
//! serves pre-built pictures for tests and embedders.

mod error;
mod in_memory;
mod layout;
mod raw_file;

pub use error::{IoError, IoResult};
pub use in_memory::InMemorySequenceIo;
pub use layout::{PixelLayout, SequenceLayout};
pub use raw_file::RawFileSequenceIo;

use picture::PicP;

/// One frame's worth of test/reference/optional-mask pictures.
#[derive(Clone)]
pub struct FrameSet {
    pub test: PicP,
    pub reference: PicP,
    pub mask: Option<PicP>,
}

/// Supplies frames on demand; implementors own whatever file handles or
/// buffers back them.
pub trait SequenceIO {
    fn read_frame(&mut self, idx: usize) -> IoResult<FrameSet>;
    fn num_frames(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;

    fn pic(value: u16) -> PicP {
        let mut p = PicP::new(2, 2, 8, 0, 1, ChromaFormat::Mono400);
        p.fill(value);
        p
    }

    #[test]
    fn in_memory_reads_frames_in_order() {
        let mut io = InMemorySequenceIo::new(vec![
            FrameSet {
                test: pic(10),
                reference: pic(20),
                mask: None,
            },
            FrameSet {
                test: pic(30),
                reference: pic(40),
                mask: None,
            },
        ]);
        assert_eq!(io.num_frames(), 2);
        let frame0 = io.read_frame(0).unwrap();
        assert_eq!(frame0.test.get(0, 0, 0), 10);
        let frame1 = io.read_frame(1).unwrap();
        assert_eq!(frame1.reference.get(0, 0, 0), 40);
    }

    #[test]
    fn in_memory_rejects_out_of_range_index() {
        let mut io = InMemorySequenceIo::new(vec![FrameSet {
            test: pic(1),
            reference: pic(1),
            mask: None,
        }]);
        assert!(io.read_frame(5).is_err());
    }
}
