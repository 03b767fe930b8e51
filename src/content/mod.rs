//! Content loaders and the collaborators they wrap.
//!
//! | Module     | Source                 | Produces                         |
//! |------------|------------------------|----------------------------------|
//! | `markdown` | `posts/*.md`           | HTML body + `PostMeta`           |
//! | `post`     | `posts/*.md`           | [`Post`] (body, metadata, card)  |
//! | `template` | `templates/*.html`     | [`CompiledTemplate`]             |
//! | `style`    | `styles/*.scss|*.css`  | `Stylesheet`                     |
//! | `card`     | post/site metadata     | PNG bytes                        |
//!
//! Each loader implements [`ContentHandler`](crate::watch::ContentHandler):
//! it builds the new value first and only then swaps it into its store, so a
//! failed reload leaves the previous value in place.

pub mod card;
pub mod markdown;
pub mod post;
pub mod style;
pub mod template;

pub use card::CardPainter;
pub use post::{Post, PostBuilder, PostLoader, PostStore};
pub use style::{StyleCompiler, StyleLoader, StyleStore, load_styles};
pub use template::{CompiledTemplate, TemplateLoader, TemplateStore, load_templates};
