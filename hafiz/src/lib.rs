//! # Hafiz — presenter retention for view layers
//!
//! Keeps presenters alive while the views that own them are destroyed and
//! recreated, and binds the same instance again when the view comes back.
//!
//! ```rust,ignore
//! use hafiz::prelude::*;
//!
//! let context = RetentionContext::builder()
//!     .bind_view(&HOME_SCREEN, home_binder())
//!     .build()?;
//!
//! let session = generate_session_tag(screen.view_class());
//! context.resolve_all(&mut screen, &session)?;
//! ```

pub use hafiz_core::*;
pub use hafiz_support::*;
