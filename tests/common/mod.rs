#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;
use tower::ServiceExt;

use photoframe::frames::FrameSet;
use photoframe::services::classifier::{Classification, ClassifyError, VerdictClassifier};
use photoframe::storage::{Publisher, StorageError};
use photoframe::{AppState, build_router};

pub const PUBLIC_BASE: &str = "https://storage.googleapis.com/test-bucket";
pub const YES_FRAME_SIZE: (u32, u32) = (500, 400);
pub const NO_FRAME_SIZE: (u32, u32) = (300, 300);
const BOUNDARY: &str = "photoframe-test-boundary";

/// Classifier that returns a canned reply, or fails when there is none.
pub struct FakeClassifier {
    reply: Option<String>,
    pub calls: AtomicUsize,
    pub mime_types: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            mime_types: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            mime_types: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VerdictClassifier for FakeClassifier {
    async fn classify(
        &self,
        _image: &[u8],
        mime_type: &str,
    ) -> Result<Classification, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mime_types.lock().unwrap().push(mime_type.to_string());
        match &self.reply {
            Some(reply) => Ok(Classification::from_reply(reply)),
            None => Err(ClassifyError::Api {
                status: 503,
                body: "model overloaded".into(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub data: Bytes,
    pub content_type: String,
}

/// Publisher that keeps every write in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    pub fail: bool,
    pub objects: Mutex<Vec<StoredObject>>,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            objects: Mutex::new(Vec::new()),
        }
    }

    pub fn stored(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Gcs("bucket unavailable".into()));
        }
        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            data,
            content_type: content_type.to_string(),
        });
        Ok(format!("{}/{}", PUBLIC_BASE, key))
    }
}

pub struct TestApp {
    pub router: Router,
    pub classifier: Arc<FakeClassifier>,
    pub publisher: Arc<RecordingPublisher>,
    pub frames_dir: TempDir,
}

/// Opaque border around a transparent window, like the real artwork.
pub fn frame_asset(width: u32, height: u32, border: u32, color: [u8; 3]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= border && x < width - border && y >= border && y < height - border;
        if inside {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([color[0], color[1], color[2], 255])
        }
    })
}

pub fn write_frames(dir: &TempDir) {
    let (w, h) = YES_FRAME_SIZE;
    frame_asset(w, h, 40, [0, 160, 0])
        .save(dir.path().join("yes.png"))
        .unwrap();
    let (w, h) = NO_FRAME_SIZE;
    frame_asset(w, h, 40, [160, 0, 0])
        .save(dir.path().join("no.png"))
        .unwrap();
}

pub fn build_test_app(classifier: FakeClassifier, publisher: RecordingPublisher) -> TestApp {
    let frames_dir = tempfile::tempdir().unwrap();
    write_frames(&frames_dir);
    build_test_app_with_frames(classifier, publisher, frames_dir)
}

pub fn build_test_app_with_frames(
    classifier: FakeClassifier,
    publisher: RecordingPublisher,
    frames_dir: TempDir,
) -> TestApp {
    let classifier = Arc::new(classifier);
    let publisher = Arc::new(publisher);

    let state = Arc::new(AppState {
        classifier: classifier.clone(),
        publisher: publisher.clone(),
        frames: FrameSet::new(frames_dir.path(), 50),
    });

    TestApp {
        router: build_router(state, 20 * 1024 * 1024),
        classifier,
        publisher,
        frames_dir,
    }
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn test_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Build a multipart POST carrying a single file field.
pub fn multipart_request(uri: &str, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a multipart POST carrying a single plain (non-file) form field.
pub fn text_field_request(uri: &str, field: &str, value: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    );

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
