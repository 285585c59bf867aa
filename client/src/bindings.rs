//! WebAssembly exports for advisory checks in the browser
//!
//! These mirror the server-side rules so the UI can disable controls early;
//! the server still enforces every one of them.

use rust_decimal::Decimal;
use shared::{
    can_counter, counter_hint, derive_grand_total, validate_items, validate_rejection_reason,
    validate_tax_rate, QuoteItem, QuoteStatus,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("quote desk client loaded"));
}

#[wasm_bindgen]
pub fn can_counter_round(round: u32) -> bool {
    can_counter(round)
}

/// "(Maximum 5 rounds)" once the cap is one round away
#[wasm_bindgen]
pub fn counter_round_hint(round: u32) -> Option<String> {
    counter_hint(round).map(str::to_string)
}

#[wasm_bindgen]
pub fn quote_status_label(status: &str) -> Result<String, JsValue> {
    status_label(status).map_err(|e| JsValue::from_str(&e))
}

/// Label, tone and icon of a status as a plain object
#[wasm_bindgen]
pub fn quote_status_display(status: &str) -> Result<JsValue, JsValue> {
    let parsed = parse_status(status).map_err(|e| JsValue::from_str(&e))?;
    let display = parsed.display();

    let object = js_sys::Object::new();
    js_sys::Reflect::set(&object, &"label".into(), &display.label.into())?;
    js_sys::Reflect::set(&object, &"icon".into(), &display.icon.into())?;
    let tone = serde_json::to_value(display.tone)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    js_sys::Reflect::set(&object, &"tone".into(), &tone.into())?;
    Ok(object.into())
}

/// Grand total for `items_json` (array of `{description, quantity, unit_price}`)
/// at `tax_rate`, as a decimal string
#[wasm_bindgen]
pub fn derive_quote_total(items_json: &str, tax_rate: &str) -> Result<String, JsValue> {
    quote_total(items_json, tax_rate).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn is_valid_rejection_reason(reason: &str) -> bool {
    validate_rejection_reason(reason).is_ok()
}

fn parse_status(status: &str) -> Result<QuoteStatus, String> {
    QuoteStatus::from_str(status).ok_or_else(|| format!("Unknown quote status: {}", status))
}

fn status_label(status: &str) -> Result<String, String> {
    parse_status(status).map(|s| s.display().label.to_string())
}

fn quote_total(items_json: &str, tax_rate: &str) -> Result<String, String> {
    let items: Vec<QuoteItem> =
        serde_json::from_str(items_json).map_err(|e| format!("Invalid items JSON: {}", e))?;
    let tax_rate: Decimal = tax_rate
        .trim()
        .parse()
        .map_err(|e| format!("Invalid tax rate: {}", e))?;
    validate_items(&items)?;
    validate_tax_rate(tax_rate)?;
    Ok(derive_grand_total(&items, tax_rate).to_string())
}
