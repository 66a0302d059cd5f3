//! Browser-side capabilities: image fetching, persistence, and notices.

use easel_editor::{ImageStore, Notice, Notifier, PersistenceError};
use easel_render::{FetchMode, FetchedImage, ImageLoadError, ImageSource};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestCredentials, RequestInit, RequestMode, Response, ResponseType};

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

// ─── Fetch ───────────────────────────────────────────────────────────────

/// Fetches images with `window.fetch`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSource;

impl BrowserSource {
    async fn fetch_response(url: &str, mode: FetchMode) -> Result<Response, JsValue> {
        let init = RequestInit::new();
        init.set_method("GET");
        match mode {
            FetchMode::Anonymous => {
                init.set_mode(RequestMode::Cors);
                init.set_credentials(RequestCredentials::Omit);
            }
            FetchMode::NoCors => init.set_mode(RequestMode::NoCors),
        }
        let request = Request::new_with_str_and_init(url, &init)?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let response = JsFuture::from(window.fetch_with_request(&request)).await?;
        response.dyn_into::<Response>()
    }
}

impl ImageSource for BrowserSource {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<FetchedImage, ImageLoadError> {
        let failed = |reason: String| ImageLoadError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = Self::fetch_response(url, mode)
            .await
            .map_err(|e| failed(describe(&e)))?;

        let opaque = response.type_() == ResponseType::Opaque;
        if !opaque && !response.ok() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        let buffer = response.array_buffer().map_err(|e| failed(describe(&e)))?;
        let buffer = JsFuture::from(buffer).await.map_err(|e| failed(describe(&e)))?;
        let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
        Ok(FetchedImage {
            bytes,
            origin_clean: !opaque,
        })
    }
}

// ─── Persistence ─────────────────────────────────────────────────────────

/// Calls a host function `(dataUrl) => url | Promise<url>`.
#[derive(Debug, Clone)]
pub struct JsImageStore {
    persist: js_sys::Function,
}

impl JsImageStore {
    pub fn new(persist: js_sys::Function) -> Self {
        Self { persist }
    }
}

impl ImageStore for JsImageStore {
    async fn save(&self, encoded_image: &str) -> Result<String, PersistenceError> {
        let returned = self
            .persist
            .call1(&JsValue::NULL, &JsValue::from_str(encoded_image))
            .map_err(|e| PersistenceError::Unavailable(describe(&e)))?;
        let value = match returned.dyn_into::<js_sys::Promise>() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .map_err(|e| PersistenceError::Unavailable(describe(&e)))?,
            Err(value) => value,
        };
        value.as_string().ok_or_else(|| {
            PersistenceError::Rejected(format!("expected a URL string, got {value:?}"))
        })
    }
}

// ─── Notices ─────────────────────────────────────────────────────────────

/// Calls a host function `(message, isError) => void`.
#[derive(Debug, Clone)]
pub struct JsNotifier {
    callback: js_sys::Function,
}

impl JsNotifier {
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }
}

impl Notifier for JsNotifier {
    fn notify(&self, notice: Notice) {
        let message = JsValue::from_str(&notice.to_string());
        let is_error = JsValue::from_bool(notice.is_error());
        if let Err(e) = self.callback.call2(&JsValue::NULL, &message, &is_error) {
            log::warn!("notice callback threw: {}", describe(&e));
        }
    }
}
