use anyhow::{Context, Result, anyhow};
use headless_chrome::Tab;
use serde_json::Value;
use std::sync::Arc;

use crate::types::{ELEMENT_TEXT_MAX_CHARS, ElementSummary, INTERACTABLE_SELECTOR};

/// Builds the script listing interactable elements.
///
/// Read-only: the page is not modified. The result is a JSON string so the
/// whole list crosses the protocol boundary as one value.
fn interactables_js() -> String {
    format!(
        r#"
(() => JSON.stringify(
  [...document.querySelectorAll('{INTERACTABLE_SELECTOR}')].map((el, index) => ({{
    index,
    tag: el.tagName.toLowerCase(),
    text: (el.innerText || el.textContent || '').trim().slice(0, {ELEMENT_TEXT_MAX_CHARS}),
  }}))
))()
"#
    )
}

/// Counts elements with any direct text node containing the keyword.
fn keyword_count_js(keyword: &str) -> Result<String> {
    let literal = serde_json::to_string(keyword)?;
    Ok(format!(
        r#"
(() => {{
  const keyword = {literal};
  let count = 0;
  for (const el of document.querySelectorAll('*')) {{
    for (const node of el.childNodes) {{
      if (node.nodeType === Node.TEXT_NODE && node.textContent.includes(keyword)) {{
        count++;
        break;
      }}
    }}
  }}
  return count;
}})()
"#
    ))
}

/// List the interactable elements currently on the page.
pub fn query_interactables(tab: &Arc<Tab>) -> Result<Vec<ElementSummary>> {
    let result = tab.evaluate(&interactables_js(), false)?;
    parse_listing(result.value)
}

/// Count elements whose own text contains `keyword`.
pub fn count_keyword(tab: &Arc<Tab>, keyword: &str) -> Result<u64> {
    let result = tab.evaluate(&keyword_count_js(keyword)?, false)?;
    parse_count(result.value)
}

fn parse_listing(value: Option<Value>) -> Result<Vec<ElementSummary>> {
    let raw = value
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("page returned no interactable listing"))?;
    serde_json::from_str(raw).context("unexpected interactable listing from page")
}

fn parse_count(value: Option<Value>) -> Result<u64> {
    value
        .as_ref()
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("page returned no keyword count"))
}
