//! Batch conversion WASM binding.

use crate::options::parse_options;
use crate::reporter::JsReporter;
use crate::types::JsBatchResult;
use js_sys::{Array, Reflect, Uint8Array};
use rawdrop_core::{BatchConverter, Upload};
use wasm_bindgen::prelude::*;

/// Read `{ name, bytes }` entries from a JavaScript array.
fn read_uploads(files: &Array) -> Result<Vec<Upload>, JsValue> {
    files
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let name = Reflect::get(&entry, &JsValue::from_str("name"))?
                .as_string()
                .ok_or_else(|| JsValue::from_str(&format!("files[{}].name must be a string", i)))?;

            let bytes = Reflect::get(&entry, &JsValue::from_str("bytes"))?;
            if !bytes.is_instance_of::<Uint8Array>() {
                return Err(JsValue::from_str(&format!(
                    "files[{}].bytes must be a Uint8Array",
                    i
                )));
            }

            Ok(Upload::new(name, Uint8Array::new(&bytes).to_vec()))
        })
        .collect()
}

/// Convert a batch of RAW files into one ZIP archive.
///
/// Each file is converted independently; a failure is reported through
/// `reporter.onError` and listed in the result, and the remaining files are
/// still processed.
///
/// # Arguments
///
/// * `files` - Array of `{ name: string, bytes: Uint8Array }`
/// * `options` - Optional conversion options object
/// * `reporter` - Optional `{ onProgress, onError, onSuccess }` callbacks
///
/// # Errors
///
/// Returns an error only for malformed arguments or if the archive cannot
/// be written; per-file failures are part of the result.
///
/// # Example
///
/// ```typescript
/// const files = await Promise.all([...input.files].map(async (f) => ({
///   name: f.name,
///   bytes: new Uint8Array(await f.arrayBuffer()),
/// })));
/// const result = convert_batch(files, { format: 'jpeg' }, {
///   onProgress: (p) => (progress.value = p),
/// });
/// download(result.zip(), result.archive_name);
/// ```
#[wasm_bindgen]
pub fn convert_batch(
    files: Array,
    options: JsValue,
    reporter: JsValue,
) -> Result<JsBatchResult, JsValue> {
    let options = parse_options(options)?;
    let mut reporter = JsReporter::from_value(&reporter)?;
    let uploads = read_uploads(&files)?;

    let converter = BatchConverter::new(options).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let output = converter.run(uploads, &mut reporter);

    JsBatchResult::from_output(&output).map_err(|e| JsValue::from_str(&e.to_string()))
}


/// WASM-specific tests that require JsValue.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use js_sys::Object;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn file(name: &str, bytes: &[u8]) -> JsValue {
        let obj = Object::new();
        Reflect::set(&obj, &"name".into(), &JsValue::from_str(name)).unwrap();
        Reflect::set(&obj, &"bytes".into(), &Uint8Array::from(bytes)).unwrap();
        obj.into()
    }

    #[wasm_bindgen_test]
    fn test_empty_batch() {
        let result = convert_batch(Array::new(), JsValue::UNDEFINED, JsValue::UNDEFINED).unwrap();
        assert_eq!(result.converted_count(), 0);
        assert_eq!(result.failed_count(), 0);
    }

    #[wasm_bindgen_test]
    fn test_failures_reported_not_thrown() {
        let files = Array::of2(&file("a.ARW", &[1, 2, 3]), &file("b.ARW", &[]));
        let errors = Array::new();
        let reporter = Object::new();
        let push = js_sys::Function::new_with_args("name, message", "this.push(name)");
        Reflect::set(&reporter, &"onError".into(), &push.bind(&errors)).unwrap();

        let result = convert_batch(files, JsValue::UNDEFINED, reporter.into()).unwrap();
        assert_eq!(result.failed_count(), 2);
        assert_eq!(errors.length(), 2);
        assert_eq!(errors.get(0).as_string(), Some("a.ARW".to_string()));
    }

    #[wasm_bindgen_test]
    fn test_malformed_entry_rejected() {
        let files = Array::of1(&JsValue::from_f64(3.0));
        assert!(convert_batch(files, JsValue::UNDEFINED, JsValue::UNDEFINED).is_err());

        let obj = Object::new();
        Reflect::set(&obj, &"name".into(), &JsValue::from_str("a.ARW")).unwrap();
        Reflect::set(&obj, &"bytes".into(), &JsValue::from_str("nope")).unwrap();
        let files = Array::of1(&obj);
        assert!(convert_batch(files, JsValue::UNDEFINED, JsValue::UNDEFINED).is_err());
    }
}
