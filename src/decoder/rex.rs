// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Bindings to the vendor REX shared library.
//!
//! The library is process wide: it is loaded from the SDK directory once, and
//! unloaded when the [`Decoder`] drops. Only available with the `rex-sdk`
//! feature, which links the SDK's glue library (see build.rs).

use std::ffi::{c_char, c_int, c_void, CString};
use std::fmt;
use std::path::Path;
use std::ptr;

use tracing::{debug, info};

use super::{DecoderError, LoopInfo, SliceInfo};
use crate::audio::SampleBuffer;

type RexHandle = *mut c_void;
type RexCreateCallback =
    Option<extern "C" fn(percent_finished: i32, user_data: *mut c_void) -> c_int>;

/// kREXError_NoError
const REX_NO_ERROR: c_int = 1;

#[repr(C)]
#[derive(Default)]
struct RexInfo {
    channels: i32,
    sample_rate: i32,
    slice_count: i32,
    tempo: i32,
    original_tempo: i32,
    ppq_length: i32,
    time_sign_nom: i32,
    time_sign_denom: i32,
    bit_depth: i32,
}

#[repr(C)]
#[derive(Default)]
struct RexSliceInfo {
    ppq_pos: i32,
    sample_length: i32,
}

extern "C" {
    fn REXInitializeDLL_DirPath(directory: *const c_char) -> c_int;
    fn REXUninitializeDLL();
    fn REXCreate(
        handle: *mut RexHandle,
        buffer: *const c_char,
        size: i32,
        callback: RexCreateCallback,
        user_data: *mut c_void,
    ) -> c_int;
    fn REXDelete(handle: *mut RexHandle);
    fn REXGetInfo(handle: RexHandle, info_size: i32, info: *mut RexInfo) -> c_int;
    fn REXGetSliceInfo(
        handle: RexHandle,
        slice_index: i32,
        slice_info_size: i32,
        slice_info: *mut RexSliceInfo,
    ) -> c_int;
    fn REXSetOutputSampleRate(handle: RexHandle, output_sample_rate: i32) -> c_int;
    fn REXRenderSlice(
        handle: RexHandle,
        slice_index: i32,
        buffer_frame_length: i32,
        output_buffers: *mut *mut f32,
    ) -> c_int;
}

/// The initialized REX library.
pub struct Decoder {
    directory: String,
}

impl Decoder {
    /// Loads the REX library from the SDK directory.
    pub fn initialize(sdk_path: &Path) -> Result<Decoder, DecoderError> {
        let directory = sdk_path.to_string_lossy().to_string();
        let c_directory = CString::new(directory.clone())
            .map_err(|e| DecoderError::Initialize(e.to_string()))?;

        // SAFETY: the path is a valid NUL terminated string for the duration of the call.
        let result = unsafe { REXInitializeDLL_DirPath(c_directory.as_ptr()) };
        info!(directory = %directory, result, "Initialized REX library");
        if result != REX_NO_ERROR {
            return Err(DecoderError::Initialize(format!(
                "REXInitializeDLL_DirPath returned {}",
                result
            )));
        }

        Ok(Decoder { directory })
    }
}

impl super::Decoder for Decoder {
    fn open<'a>(
        &'a self,
        data: &[u8],
    ) -> Result<Box<dyn super::LoopHandle + 'a>, DecoderError> {
        let size = i32::try_from(data.len())
            .map_err(|_| DecoderError::Create(format!("{} byte file is too large", data.len())))?;

        let mut handle: RexHandle = ptr::null_mut();
        // SAFETY: data outlives the call and the library copies what it needs.
        let result = unsafe {
            REXCreate(
                &mut handle,
                data.as_ptr() as *const c_char,
                size,
                None,
                ptr::null_mut(),
            )
        };
        debug!(result, "REXCreate");
        if result != REX_NO_ERROR || handle.is_null() {
            return Err(DecoderError::Create(format!("REXCreate returned {}", result)));
        }

        Ok(Box::new(LoopHandle {
            handle,
            channels: 0,
            _decoder: self,
        }))
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        // SAFETY: every handle borrows the decoder, so none are still open.
        unsafe { REXUninitializeDLL() };
        debug!(directory = %self.directory, "Uninitialized REX library");
    }
}

impl fmt::Display for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REX ({})", self.directory)
    }
}

/// A loop opened by the REX library.
pub struct LoopHandle<'a> {
    handle: RexHandle,
    channels: usize,
    _decoder: &'a Decoder,
}

impl super::LoopHandle for LoopHandle<'_> {
    fn info(&self) -> Result<LoopInfo, DecoderError> {
        let mut info = RexInfo::default();
        // SAFETY: handle is live and info is sized as passed.
        let result =
            unsafe { REXGetInfo(self.handle, std::mem::size_of::<RexInfo>() as i32, &mut info) };
        if result != REX_NO_ERROR {
            return Err(DecoderError::Info(format!("REXGetInfo returned {}", result)));
        }

        Ok(LoopInfo {
            channels: info.channels,
            sample_rate: info.sample_rate,
            slice_count: info.slice_count,
            tempo: info.tempo,
            original_tempo: info.original_tempo,
            ppq_length: info.ppq_length,
            time_signature_numerator: info.time_sign_nom,
            time_signature_denominator: info.time_sign_denom,
            bit_depth: info.bit_depth,
        })
    }

    fn set_output_sample_rate(&mut self, sample_rate: i32) -> Result<(), DecoderError> {
        // SAFETY: handle is live.
        let result = unsafe { REXSetOutputSampleRate(self.handle, sample_rate) };
        if result != REX_NO_ERROR {
            return Err(DecoderError::SetSampleRate(sample_rate));
        }
        Ok(())
    }

    fn slice_info(&self, index: usize) -> Result<SliceInfo, DecoderError> {
        let mut slice = RexSliceInfo::default();
        // SAFETY: handle is live and slice is sized as passed.
        let result = unsafe {
            REXGetSliceInfo(
                self.handle,
                index as i32,
                std::mem::size_of::<RexSliceInfo>() as i32,
                &mut slice,
            )
        };
        if result != REX_NO_ERROR {
            return Err(DecoderError::SliceInfo {
                index,
                reason: format!("REXGetSliceInfo returned {}", result),
            });
        }

        Ok(SliceInfo {
            tick_position: slice.ppq_pos,
            frame_count: slice.sample_length,
        })
    }

    fn render_slice(&mut self, index: usize, frames: usize) -> Result<SampleBuffer, DecoderError> {
        if self.channels == 0 {
            self.channels = usize::try_from(self.info()?.channels)
                .ok()
                .filter(|c| (1..=2).contains(c))
                .ok_or_else(|| DecoderError::Info("unsupported channel count".to_string()))?;
        }
        let frame_length = i32::try_from(frames).map_err(|_| DecoderError::Render {
            index,
            reason: format!("{} frames is too long", frames),
        })?;

        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; if self.channels == 2 { frames } else { 0 }];
        let mut buffers: [*mut f32; 2] = [
            left.as_mut_ptr(),
            if self.channels == 2 {
                right.as_mut_ptr()
            } else {
                ptr::null_mut()
            },
        ];

        // SAFETY: each non-null buffer holds frame_length floats.
        let result = unsafe {
            REXRenderSlice(self.handle, index as i32, frame_length, buffers.as_mut_ptr())
        };
        if result != REX_NO_ERROR {
            return Err(DecoderError::Render {
                index,
                reason: format!("REXRenderSlice returned {}", result),
            });
        }

        let channels = if self.channels == 2 {
            vec![left, right]
        } else {
            vec![left]
        };
        SampleBuffer::from_channels(channels).ok_or_else(|| DecoderError::Render {
            index,
            reason: "mismatched channel lengths".to_string(),
        })
    }
}

impl Drop for LoopHandle<'_> {
    fn drop(&mut self) {
        // SAFETY: the handle came from REXCreate and is deleted exactly once.
        unsafe { REXDelete(&mut self.handle) };
    }
}
