/// A reusable decoded-frame buffer, lent alternately to the decoder (writer)
/// and an OCR worker (reader).
///
/// `frame_number` and the pixel contents are overwritten by the decoder each
/// time the buffer comes back around on the producer side; the allocation
/// itself is never freed for the lifetime of the owning [`crate::FrameQueue`].
#[derive(Debug)]
pub struct FrameBuffer {
    pub frame_number: i64,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: usize,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, bytes_per_line: usize) -> Self {
        Self {
            frame_number: -1,
            data: vec![0u8; bytes_per_line * height as usize],
            width,
            height,
            bytes_per_line,
        }
    }

    /// Copy `src` into this buffer's backing storage, resizing only if the
    /// decoder's output dimensions changed (e.g. after a mid-stream format
    /// change).
    pub fn fill(&mut self, frame_number: i64, width: u32, height: u32, bytes_per_line: usize, src: &[u8]) {
        self.frame_number = frame_number;
        self.width = width;
        self.height = height;
        self.bytes_per_line = bytes_per_line;
        if self.data.len() != src.len() {
            self.data.resize(src.len(), 0);
        }
        self.data.copy_from_slice(src);
    }
}
