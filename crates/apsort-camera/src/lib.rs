// apsort-camera/src/lib.rs
// ============================================================
// Video capture for the apple sorter
// GStreamer pipeline: IP-webcam MJPEG over HTTP (or a local
// V4L2 device) → jpegdec/videoconvert → BGR appsink.
// ------------------------------------------------------------
// Public API:
//   * Capture::open(source) – build and start a pipeline
//   * Capture::next_frame_blocking() – one BgrFrame, None at EOS
//   * frame_stream(capture) – async stream of BgrFrame
// ============================================================

//! apple sorter – capture layer
//!
//! Frames are delivered as tightly packed BGR8 [`BgrFrame`]s so they can be
//! wrapped by OpenCV for display and fed to the preprocessor without any
//! further conversion.

use gst::prelude::*;
use log::{info, warn};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use thiserror::Error;
use url::Url;

mod stream;
pub use stream::frame_stream;

const OPEN_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("GStreamer init failed: {0}")]
    GstInit(#[source] gst::glib::Error),
    #[error("Invalid stream URL {0:?}: {1}")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("Failed to parse pipeline: {0}")]
    ParsePipeline(#[source] gst::glib::Error),
    #[error("Pipeline is not a gst::Pipeline")]
    NotPipeline,
    #[error("AppSink element not found")]
    AppSinkNotFound,
    #[error("AppSink element downcast failed")]
    AppSinkDowncastFailed,
    #[error("Cannot open stream: {0}")]
    Open(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Failed to pull sample: {0}")]
    PullSample(#[source] gst::glib::BoolError),
    #[error("Sample has no buffer")]
    MissingBuffer,
    #[error("Sample has no caps")]
    MissingCaps,
    #[error("Caps missing struct")]
    MissingStructure,
    #[error("Failed to get field value: {0}")]
    FieldError(String),
    #[error("Buffer map failed: {0}")]
    BufferMap(String),
    #[error("Buffer too small: {got} bytes for {width}x{height} BGR")]
    ShortBuffer { got: usize, width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, CameraError>;

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// MJPEG over HTTP, e.g. an Android IP-webcam `http://host:8080/video`
    Http(Url),
    /// Local V4L2 device
    Device(PathBuf),
}

impl Source {
    pub fn http(url: &str) -> Result<Self> {
        Url::parse(url)
            .map(Source::Http)
            .map_err(|e| CameraError::InvalidUrl(url.to_string(), e))
    }

    /// `/dev/video<index>`
    pub fn device_index(index: u32) -> Self {
        Source::Device(PathBuf::from(format!("/dev/video{index}")))
    }

    /// gst-launch description for this source, ending in a BGR appsink.
    pub fn pipeline_description(&self) -> String {
        let src = match self {
            Source::Http(url) => format!(
                "souphttpsrc location=\"{url}\" is-live=true do-timestamp=true \
                 ! multipartdemux ! jpegdec"
            ),
            Source::Device(dev) => format!("v4l2src device={}", dev.display()),
        };
        format!(
            "{src} ! videoconvert ! video/x-raw,format=BGR \
             ! appsink name=sink sync=false max-buffers=2 drop=true"
        )
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Http(url) => write!(f, "{url}"),
            Source::Device(dev) => write!(f, "{}", dev.display()),
        }
    }
}

/// A captured frame, BGR8, rows without padding.
#[derive(Debug, Clone)]
pub struct BgrFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pts: Duration,
}

impl BgrFrame {
    /// Copy `height` rows of `width*3` bytes out of a buffer with row `stride`.
    pub fn from_strided(src: &[u8], width: u32, height: u32, stride: usize) -> Result<Self> {
        let row = width as usize * 3;
        let needed = if height == 0 { 0 } else { stride * (height as usize - 1) + row };
        if stride < row || src.len() < needed {
            return Err(CameraError::ShortBuffer { got: src.len(), width, height });
        }

        let mut data = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            data.extend_from_slice(&src[y * stride..y * stride + row]);
        }
        Ok(Self { data, width, height, pts: Duration::ZERO })
    }
}

/// Capture handle – owns the pipeline and *appsink*.
pub struct Capture {
    source: Source,
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    // first frame, pulled while opening
    pending: Option<BgrFrame>,
}

impl Capture {
    /// Build the pipeline and wait for its first frame.
    ///
    /// Live HTTP sources reach `Playing` before any request is made, so the
    /// stream only counts as open once a frame arrives. A bus error, an early
    /// end-of-stream or no frame within the timeout is a [`CameraError::Open`].
    ///
    /// ```no_run
    /// use apsort_camera::{Capture, Source};
    /// let mut cap = Capture::open(Source::http("http://192.168.178.153:8080/video").unwrap()).unwrap();
    /// while let Some(frame) = cap.next_frame_blocking().unwrap() {
    ///     println!("{}×{}", frame.width, frame.height);
    /// }
    /// ```
    pub fn open(source: Source) -> Result<Self> {
        let description = source.pipeline_description();
        Self::launch(source, &description, OPEN_TIMEOUT)
    }

    fn launch(source: Source, description: &str, timeout: Duration) -> Result<Self> {
        gst::init().map_err(CameraError::GstInit)?;

        let pipeline = gst::parse::launch(description)
            .map_err(CameraError::ParsePipeline)?
            .downcast::<gst::Pipeline>()
            .map_err(|_| CameraError::NotPipeline)?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or(CameraError::AppSinkNotFound)?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| CameraError::AppSinkDowncastFailed)?;

        let mut cap = Self { source, pipeline, appsink, pending: None };

        if let Err(e) = cap.pipeline.set_state(gst::State::Playing) {
            let reason = cap.bus_error().unwrap_or_else(|| e.to_string());
            return Err(CameraError::Open(format!("{}: {reason}", cap.source)));
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(reason) = cap.bus_error() {
                return Err(CameraError::Open(format!("{}: {reason}", cap.source)));
            }
            if let Some(sample) = cap.appsink.try_pull_sample(gst::ClockTime::from_mseconds(POLL_MS)) {
                cap.pending = Some(Self::sample_to_frame(sample)?);
                break;
            }
            if cap.appsink.is_eos() {
                return Err(CameraError::Open(format!(
                    "{} ended before the first frame",
                    cap.source
                )));
            }
            if Instant::now() >= deadline {
                return Err(CameraError::Open(format!(
                    "{}: no frame within {:?}",
                    cap.source, timeout
                )));
            }
        }

        info!("capturing from {}", cap.source);
        Ok(cap)
    }

    /// Blocking retrieval. `Ok(None)` once the stream has ended cleanly;
    /// an error posted by the pipeline is returned instead of end-of-stream.
    pub fn next_frame_blocking(&mut self) -> Result<Option<BgrFrame>> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        match self.appsink.pull_sample() {
            Ok(sample) => Self::sample_to_frame(sample).map(Some),
            Err(e) => {
                if let Some(reason) = self.bus_error() {
                    return Err(CameraError::Stream(reason));
                }
                if self.appsink.is_eos() {
                    Ok(None)
                } else {
                    Err(CameraError::PullSample(e))
                }
            }
        }
    }

    /// Pending error message on the pipeline bus, if any.
    fn bus_error(&self) -> Option<String> {
        let msg = self.pipeline.bus()?.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(e) => {
                warn!("pipeline error: {} ({:?})", e.error(), e.debug());
                Some(e.error().to_string())
            }
            _ => None,
        }
    }

    /// Convert a `gst::Sample` into our [`BgrFrame`] wrapper.
    fn sample_to_frame(sample: gst::Sample) -> Result<BgrFrame> {
        let buffer = sample.buffer().ok_or(CameraError::MissingBuffer)?;
        let caps   = sample.caps().ok_or(CameraError::MissingCaps)?;
        let s      = caps.structure(0).ok_or(CameraError::MissingStructure)?;
        let width  = s.get::<i32>("width").map_err(|e| CameraError::FieldError(e.to_string()))? as u32;
        let height = s.get::<i32>("height").map_err(|e| CameraError::FieldError(e.to_string()))? as u32;

        let pts = buffer
            .pts()
            .map(|t| Duration::from_nanos(t.nseconds()))
            .unwrap_or(Duration::ZERO);

        let map = buffer.map_readable().map_err(|e| CameraError::BufferMap(e.to_string()))?;
        // raw BGR rows are padded to 4 bytes
        let stride = if height > 0 { map.size() / height as usize } else { 0 };
        let mut frame = BgrFrame::from_strided(map.as_slice(), width, height, stride)?;
        frame.pts = pts;
        Ok(frame)
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_source_pipeline() {
        let src = Source::http("http://192.168.178.153:8080/video").unwrap();
        let desc = src.pipeline_description();
        assert!(desc.starts_with("souphttpsrc location=\"http://192.168.178.153:8080/video\""));
        assert!(desc.contains("multipartdemux ! jpegdec"));
        assert!(desc.ends_with("appsink name=sink sync=false max-buffers=2 drop=true"));
    }

    #[test]
    fn device_source_pipeline() {
        let desc = Source::device_index(0).pipeline_description();
        assert!(desc.starts_with("v4l2src device=/dev/video0 ! videoconvert"));
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(matches!(Source::http("not a url"), Err(CameraError::InvalidUrl(..))));
    }

    #[test]
    fn strided_rows_are_packed() {
        // 2x2 BGR, stride 8 (6 bytes + 2 padding)
        let src = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let f = BgrFrame::from_strided(&src, 2, 2, 8).unwrap();
        assert_eq!(f.data, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn short_buffer_is_error() {
        let src = [0u8; 10];
        assert!(matches!(
            BgrFrame::from_strided(&src, 2, 2, 6),
            Err(CameraError::ShortBuffer { .. })
        ));
    }

    const BGR_SINK: &str = "videoconvert ! video/x-raw,format=BGR ! appsink name=sink sync=false";

    // videotestsrc ships with gst-plugins-base; skip quietly without it
    fn test_source_available() -> bool {
        gst::init().is_ok() && gst::ElementFactory::find("videotestsrc").is_some()
    }

    fn test_pattern(buffers: u32) -> String {
        format!("videotestsrc num-buffers={buffers} ! video/x-raw,width=32,height=16 ! {BGR_SINK}")
    }

    #[test]
    fn first_frame_is_kept_then_stream_ends() {
        if !test_source_available() {
            return;
        }
        let mut cap = Capture::launch(Source::device_index(0), &test_pattern(3), OPEN_TIMEOUT).unwrap();
        let mut frames = 0;
        while let Some(f) = cap.next_frame_blocking().unwrap() {
            assert_eq!((f.width, f.height), (32, 16));
            assert_eq!(f.data.len(), 32 * 16 * 3);
            frames += 1;
        }
        assert_eq!(frames, 3);
    }

    #[test]
    fn stream_without_frames_fails_to_open() {
        if !test_source_available() {
            return;
        }
        let res = Capture::launch(Source::device_index(0), &test_pattern(0), OPEN_TIMEOUT);
        assert!(matches!(res, Err(CameraError::Open(_))));
    }

    #[test]
    fn bus_error_wins_over_end_of_stream() {
        if !test_source_available() {
            return;
        }
        let mut cap = Capture::launch(Source::device_index(0), &test_pattern(1), OPEN_TIMEOUT).unwrap();
        let msg = gst::message::Error::builder(gst::ResourceError::Read, "connection refused").build();
        assert!(cap.pipeline.bus().unwrap().post(msg).is_ok());

        assert!(cap.next_frame_blocking().unwrap().is_some());
        assert!(matches!(cap.next_frame_blocking(), Err(CameraError::Stream(_))));
    }

    #[test]
    #[ignore]
    fn unreachable_host_fails_to_open() {
        let src = Source::http("http://127.0.0.1:9/video").unwrap();
        assert!(matches!(Capture::open(src), Err(CameraError::Open(_))));
    }

    #[test]
    #[ignore]
    fn capture_one() {
        let url = std::env::var("APSORT_STREAM_URL")
            .unwrap_or_else(|_| "http://192.168.178.153:8080/video".to_string());
        let mut cap = Capture::open(Source::http(&url).expect("url")).expect("open");
        let frame = cap.next_frame_blocking().expect("frame").expect("not eos");
        assert_eq!(frame.data.len(), (frame.width * frame.height * 3) as usize);
    }
}
