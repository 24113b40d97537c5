//! Text rendering utilities for diagnostics.
//!
//! Used to print view ancestor chains in logs and errors, and to
//! derive short class names for generated session tags.

/// Renders an ancestor chain as a readable string, most-derived first.
///
/// # Examples
/// ```
/// use hafiz_support::rendering::render_chain;
///
/// let chain = vec!["ProfileScreen", "BaseScreen", "Screen"];
/// assert_eq!(render_chain(&chain), "ProfileScreen → BaseScreen → Screen");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use hafiz_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::screens::profile::ProfileScreen");
/// assert_eq!(short, "ProfileScreen");
///
/// let short = shorten_type_name("alloc::sync::Arc<my_app::presenters::ProfilePresenter>");
/// assert_eq!(short, "Arc<ProfilePresenter>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    // Keep only the last segment of every path:
    // "a::b::Screen" → "Screen", "Arc<a::P>" → "Arc<P>"
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}
