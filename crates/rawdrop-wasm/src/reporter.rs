//! Batch progress reporting into JavaScript callbacks.

use js_sys::{Function, Reflect};
use rawdrop_core::BatchReporter;
use wasm_bindgen::prelude::*;

/// Forwards batch progress to optional `onProgress`, `onError` and
/// `onSuccess` callbacks on a JavaScript object.
///
/// ```typescript
/// convert_batch(files, undefined, {
///   onProgress: (fraction) => bar.value = fraction,
///   onError: (name, message) => errors.push(message),
///   onSuccess: (name) => done.push(name),
/// });
/// ```
///
/// Errors are also written to the browser console. A callback that throws is
/// logged and otherwise ignored so the batch keeps going.
#[derive(Default)]
pub(crate) struct JsReporter {
    on_progress: Option<Function>,
    on_error: Option<Function>,
    on_success: Option<Function>,
}

impl JsReporter {
    /// Read the callbacks from `value`; `undefined` or `null` gives a reporter
    /// that only logs.
    pub(crate) fn from_value(value: &JsValue) -> Result<Self, JsValue> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        if !value.is_object() {
            return Err(JsValue::from_str("Reporter must be an object"));
        }

        Ok(Self {
            on_progress: callback(value, "onProgress")?,
            on_error: callback(value, "onError")?,
            on_success: callback(value, "onSuccess")?,
        })
    }
}

fn callback(target: &JsValue, key: &str) -> Result<Option<Function>, JsValue> {
    let value = Reflect::get(target, &JsValue::from_str(key))?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .dyn_into::<Function>()
        .map(Some)
        .map_err(|_| JsValue::from_str(&format!("Reporter {} must be a function", key)))
}

fn log_callback_failure(key: &str, err: &JsValue) {
    web_sys::console::warn_2(&JsValue::from_str(&format!("{} callback threw", key)), err);
}

impl BatchReporter for JsReporter {
    fn report_progress(&mut self, fraction: f32) {
        if let Some(f) = &self.on_progress {
            if let Err(err) = f.call1(&JsValue::NULL, &JsValue::from_f64(fraction as f64)) {
                log_callback_failure("onProgress", &err);
            }
        }
    }

    fn report_error(&mut self, name: &str, message: &str) {
        web_sys::console::error_1(&JsValue::from_str(message));
        if let Some(f) = &self.on_error {
            let result = f.call2(
                &JsValue::NULL,
                &JsValue::from_str(name),
                &JsValue::from_str(message),
            );
            if let Err(err) = result {
                log_callback_failure("onError", &err);
            }
        }
    }

    fn report_success(&mut self, name: &str) {
        if let Some(f) = &self.on_success {
            if let Err(err) = f.call1(&JsValue::NULL, &JsValue::from_str(name)) {
                log_callback_failure("onSuccess", &err);
            }
        }
    }
}
