use wasm_bindgen::prelude::*;

use crate::config::RenderConfig;

fn to_js(e: crate::AtelierError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn config_from(value: JsValue) -> Result<RenderConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(RenderConfig::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("invalid render config: {}", e)))
}

#[wasm_bindgen]
pub fn render_certificate_pdf(json: &str, config: JsValue) -> Result<Vec<u8>, JsValue> {
    crate::render_certificate_json(json, &config_from(config)?).map_err(to_js)
}

#[wasm_bindgen]
pub fn render_portfolio_pdf(json: &str, config: JsValue) -> Result<Vec<u8>, JsValue> {
    crate::render_portfolio_json(json, &config_from(config)?).map_err(to_js)
}
