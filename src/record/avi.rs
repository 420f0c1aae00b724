//! Motion-JPEG in a RIFF/AVI container.
//!
//! Layout: `RIFF AVI ( LIST hdrl ( avih LIST strl ( strh strf ) ) LIST movi ( 00dc... ) idx1 )`.
//! Counters and sizes that depend on the frames written are patched when the
//! stream is finished.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::{BufMut, BytesMut};
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info, warn};

use super::{StreamGeometry, VideoWriter};
use crate::capture::Frame;
use crate::error::PipelineError;

const AVIF_HASINDEX: u32 = 0x10;
const AVIIF_KEYFRAME: u32 = 0x10;
const CHUNK_ID: &[u8; 4] = b"00dc";
const INDEX_ENTRY_LEN: u64 = 16;

/// Header fields rewritten on finish, as offsets from the start of the RIFF.
#[derive(Debug, Clone, Copy)]
struct Patches {
    riff_size: u64,
    max_bytes_per_sec: u64,
    total_frames: u64,
    avih_buffer_size: u64,
    strh_length: u64,
    strh_buffer_size: u64,
    movi_size: u64,
    /// Position of the `movi` fourcc; index offsets are relative to it
    movi_start: u64,
}

/// Seekable byte sink that can also be cut short, so a finished stream never
/// carries leftovers of a chunk whose write failed.
pub trait OutputStream: Write + Seek {
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl OutputStream for BufWriter<File> {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.flush()?;
        self.get_ref().set_len(len)
    }
}

impl OutputStream for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}

impl<T: OutputStream + ?Sized> OutputStream for &mut T {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        (**self).set_len(len)
    }
}

struct IndexEntry {
    offset: u32,
    size: u32,
}

pub struct AviWriter<W: OutputStream> {
    inner: W,
    geometry: StreamGeometry,
    quality: u8,
    /// Stream position where the RIFF header begins
    base: u64,
    /// End of the last complete chunk, relative to `base`
    position: u64,
    /// A chunk write failed part way; the cursor is past `position`
    torn: bool,
    patches: Patches,
    index: Vec<IndexEntry>,
    max_chunk: u32,
    finished: bool,
}

impl AviWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write the stream header.
    pub fn create(
        path: impl AsRef<Path>,
        geometry: StreamGeometry,
        quality: u8,
    ) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| PipelineError::OutputOpen {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Recording to {}", path.display());
        Self::new(BufWriter::new(file), geometry, quality)
    }
}

impl<W: OutputStream> AviWriter<W> {
    pub fn new(mut inner: W, geometry: StreamGeometry, quality: u8) -> Result<Self, PipelineError> {
        let base = inner.stream_position()?;
        let (header, patches) = build_header(&geometry);
        inner.write_all(&header)?;

        Ok(Self {
            inner,
            geometry,
            quality,
            base,
            position: header.len() as u64,
            patches,
            index: Vec::new(),
            max_chunk: 0,
            torn: false,
            finished: false,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.index.len()
    }

    fn append_chunk(&mut self, data: &[u8]) -> Result<(), PipelineError> {
        let padded = data.len() as u64 + (data.len() as u64 & 1);
        // Room for this chunk plus the index that will follow it
        let projected = self.position
            + 8
            + padded
            + 8
            + INDEX_ENTRY_LEN * (self.index.len() as u64 + 1);
        if projected > u32::MAX as u64 {
            return Err(PipelineError::StreamTooLarge);
        }

        if self.torn {
            self.rewind()?;
        }

        let size = data.len() as u32;
        if let Err(e) = self.write_chunk(size, data) {
            self.torn = true;
            return Err(e.into());
        }

        self.index.push(IndexEntry {
            offset: (self.position - self.patches.movi_start) as u32,
            size,
        });
        self.max_chunk = self.max_chunk.max(size);
        self.position += 8 + padded;
        Ok(())
    }

    fn write_chunk(&mut self, size: u32, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(CHUNK_ID)?;
        self.inner.write_all(&size.to_le_bytes())?;
        self.inner.write_all(data)?;
        if data.len() % 2 == 1 {
            self.inner.write_all(&[0])?;
        }
        Ok(())
    }

    /// Move the cursor back to the end of the last complete chunk.
    fn rewind(&mut self) -> Result<(), PipelineError> {
        self.inner.seek(SeekFrom::Start(self.base + self.position))?;
        self.torn = false;
        Ok(())
    }

    fn patch(&mut self, offset: u64, value: u32) -> Result<(), PipelineError> {
        self.inner.seek(SeekFrom::Start(self.base + offset))?;
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }
}

impl<W: OutputStream> VideoWriter for AviWriter<W> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        debug_assert_eq!(frame.dimensions(), self.geometry.dimensions());

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).encode_image(&frame.image)?;
        self.append_chunk(&jpeg)
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        if self.finished {
            return Ok(());
        }
        // Never retried, even if patching fails below
        self.finished = true;

        let frames = self.index.len() as u32;
        let mut idx1 = BytesMut::with_capacity(8 + self.index.len() * INDEX_ENTRY_LEN as usize);
        idx1.put_slice(b"idx1");
        idx1.put_u32_le(frames * INDEX_ENTRY_LEN as u32);
        for entry in &self.index {
            idx1.put_slice(CHUNK_ID);
            idx1.put_u32_le(AVIIF_KEYFRAME);
            idx1.put_u32_le(entry.offset);
            idx1.put_u32_le(entry.size);
        }
        // Overwrites whatever a failed chunk write left behind
        self.rewind()?;
        self.inner.write_all(&idx1)?;

        let index_start = self.position;
        let end = index_start + idx1.len() as u64;
        let p = self.patches;
        let buffer_size = self.max_chunk + 8;

        self.patch(p.riff_size, (end - 8) as u32)?;
        self.patch(p.movi_size, (index_start - p.movi_start) as u32)?;
        self.patch(p.total_frames, frames)?;
        self.patch(p.strh_length, frames)?;
        self.patch(p.avih_buffer_size, buffer_size)?;
        self.patch(p.strh_buffer_size, buffer_size)?;
        self.patch(
            p.max_bytes_per_sec,
            buffer_size.saturating_mul(self.geometry.fps),
        )?;

        self.inner.seek(SeekFrom::Start(self.base + end))?;
        self.inner.flush()?;
        self.inner.set_len(self.base + end)?;
        self.position = end;

        debug!("AVI finalized: {} frames, {} bytes", frames, end);
        Ok(())
    }
}

impl<W: OutputStream> Drop for AviWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                warn!("Failed to finalize AVI stream: {}", e);
            }
        }
    }
}

/// Serialize everything up to and including the `movi` fourcc.
fn build_header(geometry: &StreamGeometry) -> (BytesMut, Patches) {
    let StreamGeometry {
        width,
        height,
        fps,
        codec,
    } = *geometry;
    let fourcc = codec.fourcc();
    let fps = fps.max(1);

    let mut buf = BytesMut::with_capacity(256);
    let at = |buf: &BytesMut| buf.len() as u64;

    buf.put_slice(b"RIFF");
    let riff_size = at(&buf);
    buf.put_u32_le(0);
    buf.put_slice(b"AVI ");

    // hdrl: avih (64) + strl list (12 + strh 64 + strf 48)
    buf.put_slice(b"LIST");
    buf.put_u32_le(4 + 64 + 12 + 64 + 48);
    buf.put_slice(b"hdrl");

    buf.put_slice(b"avih");
    buf.put_u32_le(56);
    buf.put_u32_le(1_000_000 / fps); // dwMicroSecPerFrame
    let max_bytes_per_sec = at(&buf);
    buf.put_u32_le(0);
    buf.put_u32_le(0); // dwPaddingGranularity
    buf.put_u32_le(AVIF_HASINDEX);
    let total_frames = at(&buf);
    buf.put_u32_le(0);
    buf.put_u32_le(0); // dwInitialFrames
    buf.put_u32_le(1); // dwStreams
    let avih_buffer_size = at(&buf);
    buf.put_u32_le(0);
    buf.put_u32_le(width);
    buf.put_u32_le(height);
    buf.put_bytes(0, 16); // dwReserved[4]

    buf.put_slice(b"LIST");
    buf.put_u32_le(4 + 64 + 48);
    buf.put_slice(b"strl");

    buf.put_slice(b"strh");
    buf.put_u32_le(56);
    buf.put_slice(b"vids");
    buf.put_slice(&fourcc);
    buf.put_u32_le(0); // dwFlags
    buf.put_u16_le(0); // wPriority
    buf.put_u16_le(0); // wLanguage
    buf.put_u32_le(0); // dwInitialFrames
    buf.put_u32_le(1); // dwScale
    buf.put_u32_le(fps); // dwRate
    buf.put_u32_le(0); // dwStart
    let strh_length = at(&buf);
    buf.put_u32_le(0);
    let strh_buffer_size = at(&buf);
    buf.put_u32_le(0);
    buf.put_u32_le(u32::MAX); // dwQuality: driver default
    buf.put_u32_le(0); // dwSampleSize
    buf.put_i16_le(0);
    buf.put_i16_le(0);
    buf.put_i16_le(width.min(i16::MAX as u32) as i16);
    buf.put_i16_le(height.min(i16::MAX as u32) as i16);

    // BITMAPINFOHEADER
    buf.put_slice(b"strf");
    buf.put_u32_le(40);
    buf.put_u32_le(40);
    buf.put_i32_le(width as i32);
    buf.put_i32_le(height as i32);
    buf.put_u16_le(1); // biPlanes
    buf.put_u16_le(24); // biBitCount
    buf.put_slice(&fourcc);
    buf.put_u32_le(width.saturating_mul(height).saturating_mul(3));
    buf.put_bytes(0, 16); // resolution and palette

    buf.put_slice(b"LIST");
    let movi_size = at(&buf);
    buf.put_u32_le(0);
    let movi_start = at(&buf);
    buf.put_slice(b"movi");

    let patches = Patches {
        riff_size,
        max_bytes_per_sec,
        total_frames,
        avih_buffer_size,
        strh_length,
        strh_buffer_size,
        movi_size,
        movi_start,
    };
    (buf, patches)
}
