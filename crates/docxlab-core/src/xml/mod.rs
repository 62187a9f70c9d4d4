//! XML bridge
//!
//! Streams an XML string into the arena tree and serialises a tree back.
//! The serialiser honours the literal-XML delimiter: text runs between two
//! delimiter markers are spliced into the output verbatim, which is how the
//! walker injects raw fragments such as `<w:br/>` without a second parse
//! pass.

mod parse;
mod serialize;

pub use parse::parse_xml;
pub use serialize::{build_xml, XmlOptions};
