// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Page scripts for scrolling, with locators escaped for JS string context.

use super::ScrollRegion;

/// JS expression evaluating to the region's element, or `null`.
fn region_expr(region: &ScrollRegion) -> String {
    match region {
        ScrollRegion::Container(locator) => {
            format!("document.querySelector('{}')", sanitize_js_string(locator))
        }
        ScrollRegion::ItemParent(locator) => format!(
            "((document.querySelector('{}') || {{}}).parentElement || null)",
            sanitize_js_string(locator)
        ),
        ScrollRegion::Viewport => {
            "(document.scrollingElement || document.documentElement)".to_string()
        }
    }
}

/// Scroll the region to its end. Evaluates to `false` if it is missing.
pub fn scroll_to_end(region: &ScrollRegion) -> String {
    format!(
        r#"(() => {{
            const el = {};
            if (!el) return false;
            el.scrollTop = el.scrollHeight;
            if (el === document.scrollingElement || el === document.documentElement) {{
                window.scrollTo(0, el.scrollHeight);
            }}
            el.dispatchEvent(new Event('scroll', {{ bubbles: true }}));
            window.dispatchEvent(new Event('resize'));
            return true;
        }})()"#,
        region_expr(region)
    )
}

/// Evaluates to the region's `scrollHeight`, or 0.
pub fn scroll_extent(region: &ScrollRegion) -> String {
    format!(
        "(() => {{ const el = {}; return el ? el.scrollHeight : 0; }})()",
        region_expr(region)
    )
}

/// Function called on an element; `true` when it is rendered and not hidden
/// by `display`, `visibility` or a zero-size box.
pub const IS_VISIBLE_FN: &str = r#"function() {
    const style = window.getComputedStyle(this);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    if (this.offsetParent === null && style.position !== 'fixed') return false;
    return this.getClientRects().length > 0;
}"#;

/// Escape a string for injection into a single-quoted JS string literal.
///
/// Backslashes, quotes, backticks and line breaks are escaped, `<`/`>` are
/// hex-escaped so a value can never close a script tag, and NUL is dropped.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
