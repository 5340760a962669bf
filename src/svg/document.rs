//! SVG document indexing and rewriting.
//!
//! The document is handled in two streaming passes over the same bytes.
//! The index pass builds an element arena (names, attributes, parent and
//! child links) and records the `<image>` and `<clipPath>` elements the
//! pipeline cares about. The rewrite pass copies every event through
//! verbatim except the start tags of patched elements, whose attributes
//! are rebuilt; comments, doctype and formatting survive untouched.
//!
//! Both passes count `Start`/`Empty` events identically, so arena indices
//! line up with rewrite-pass ordinals.

use anyhow::Result;
use quick_xml::{
    Reader, Writer,
    events::{BytesStart, Event},
};
use rustc_hash::FxHashMap;
use std::io::Cursor;

// ============================================================================
// Types
// ============================================================================

/// One indexed element: tag name, attributes in source order, tree links.
#[derive(Debug)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Element {
    /// Look up an attribute value by its literal (prefixed) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Replacement attribute list for one element, keyed by arena index.
pub type AttrPatches = FxHashMap<usize, Vec<(String, String)>>;

/// An indexed SVG document plus its original bytes.
pub struct Document {
    source: Vec<u8>,
    elements: Vec<Element>,
    /// First `<clipPath>` in document order wins for a given id.
    clip_paths: FxHashMap<String, usize>,
    /// `<image>` elements in document order.
    images: Vec<usize>,
}

// ============================================================================
// Indexing
// ============================================================================

impl Document {
    /// Index an SVG document. Fails on malformed XML.
    pub fn parse(source: Vec<u8>) -> Result<Self> {
        let mut elements: Vec<Element> = Vec::new();
        let mut clip_paths: FxHashMap<String, usize> = FxHashMap::default();
        let mut images = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        let mut reader = Reader::from_reader(source.as_slice());
        loop {
            match reader.read_event() {
                Ok(Event::Start(elem)) => {
                    let idx = index_element(
                        &elem,
                        &mut elements,
                        &mut clip_paths,
                        &mut images,
                        stack.last().copied(),
                    )?;
                    stack.push(idx);
                }
                Ok(Event::Empty(elem)) => {
                    index_element(
                        &elem,
                        &mut elements,
                        &mut clip_paths,
                        &mut images,
                        stack.last().copied(),
                    )?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => anyhow::bail!(
                    "XML parse error at position {}: {:?}",
                    reader.error_position(),
                    e
                ),
            }
        }

        Ok(Self {
            source,
            elements,
            clip_paths,
            images,
        })
    }

    #[inline]
    pub fn element(&self, idx: usize) -> &Element {
        &self.elements[idx]
    }

    /// `<image>` element indices in document order.
    pub fn images(&self) -> &[usize] {
        &self.images
    }

    /// First `<clipPath>` element carrying the given id.
    pub fn clip_path_by_id(&self, id: &str) -> Option<usize> {
        self.clip_paths.get(id).copied()
    }

    // ========================================================================
    // Rewriting
    // ========================================================================

    /// Re-serialize the document, swapping in replacement attributes for
    /// the patched elements and passing everything else through verbatim.
    pub fn to_patched_bytes(&self, patches: &AttrPatches) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::with_capacity(self.source.len())));
        let mut reader = Reader::from_reader(self.source.as_slice());
        let mut ordinal = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(elem)) => {
                    let idx = ordinal;
                    ordinal += 1;
                    match patches.get(&idx) {
                        Some(attrs) => {
                            writer.write_event(Event::Start(self.rebuild_start(idx, attrs)))?;
                        }
                        None => writer.write_event(Event::Start(elem))?,
                    }
                }
                Ok(Event::Empty(elem)) => {
                    let idx = ordinal;
                    ordinal += 1;
                    match patches.get(&idx) {
                        Some(attrs) => {
                            writer.write_event(Event::Empty(self.rebuild_start(idx, attrs)))?;
                        }
                        None => writer.write_event(Event::Empty(elem))?,
                    }
                }
                Ok(Event::Eof) => break,
                Ok(event) => writer.write_event(event)?,
                Err(e) => anyhow::bail!(
                    "XML parse error at position {}: {:?}",
                    reader.error_position(),
                    e
                ),
            }
        }

        Ok(writer.into_inner().into_inner())
    }

    fn rebuild_start(&self, idx: usize, attrs: &[(String, String)]) -> BytesStart<'_> {
        let mut out = BytesStart::new(self.elements[idx].name.as_str());
        for (k, v) in attrs {
            out.push_attribute((k.as_str(), v.as_str()));
        }
        out
    }
}

/// Record one start tag in the arena. Returns its index.
fn index_element(
    elem: &BytesStart<'_>,
    elements: &mut Vec<Element>,
    clip_paths: &mut FxHashMap<String, usize>,
    images: &mut Vec<usize>,
    parent: Option<usize>,
) -> Result<usize> {
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in elem.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }

    let idx = elements.len();
    if name == "image" {
        images.push(idx);
    } else if name == "clipPath"
        && let Some(id) = attrs.iter().find(|(k, _)| k == "id").map(|(_, v)| v.clone())
    {
        clip_paths.entry(id).or_insert(idx);
    }

    elements.push(Element {
        name,
        attrs,
        parent,
        children: Vec::new(),
    });
    if let Some(p) = parent {
        elements[p].children.push(idx);
    }
    Ok(idx)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- editor metadata -->
<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
  <defs>
    <clipPath id="clipA"><rect x="10" y="5" width="80" height="40"/></clipPath>
    <clipPath id="clipA"><rect width="1" height="1"/></clipPath>
  </defs>
  <g transform="translate(2,3)">
    <image x="0" y="0" width="100" height="50" xlink:href="a.png" clip-path="url(#clipA)"/>
  </g>
  <image width="10" height="10" href="b.png"/>
</svg>
"#;

    fn parse_sample() -> Document {
        Document::parse(SAMPLE.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_index_finds_images_in_document_order() {
        let doc = parse_sample();
        let names: Vec<_> = doc
            .images()
            .iter()
            .map(|&i| doc.element(i).attr("xlink:href").or(doc.element(i).attr("href")))
            .collect();
        assert_eq!(names, vec![Some("a.png"), Some("b.png")]);
    }

    #[test]
    fn test_index_links_parents_and_children() {
        let doc = parse_sample();
        let img = doc.images()[0];
        let g = doc.element(img).parent.unwrap();
        assert_eq!(doc.element(g).name, "g");
        assert_eq!(doc.element(g).attr("transform"), Some("translate(2,3)"));
        assert_eq!(doc.element(g).children, vec![img]);
        let svg = doc.element(g).parent.unwrap();
        assert_eq!(doc.element(svg).name, "svg");
        assert!(doc.element(svg).parent.is_none());
    }

    #[test]
    fn test_duplicate_clip_path_id_first_wins() {
        let doc = parse_sample();
        let clip = doc.clip_path_by_id("clipA").unwrap();
        let rect = doc.element(clip).children[0];
        assert_eq!(doc.element(rect).attr("x"), Some("10"));
    }

    #[test]
    fn test_patch_rewrites_only_target_element() {
        let doc = parse_sample();
        let img = doc.images()[0];
        let mut attrs = doc.element(img).attrs.clone();
        for (k, v) in &mut attrs {
            if k == "xlink:href" {
                *v = "data:image/png;base64,QUJD".to_string();
            }
            if k == "x" {
                *v = "10".to_string();
            }
        }
        let mut patches = AttrPatches::default();
        patches.insert(img, attrs);

        let out = String::from_utf8(doc.to_patched_bytes(&patches).unwrap()).unwrap();
        assert!(out.contains("data:image/png;base64,QUJD"));
        assert!(out.contains(r#"x="10""#));
        // untouched parts survive byte-for-byte
        assert!(out.contains("<!-- editor metadata -->"));
        assert!(out.contains(r#"<image width="10" height="10" href="b.png"/>"#));
        assert!(out.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }

    #[test]
    fn test_patch_escapes_attribute_values() {
        let doc = parse_sample();
        let img = doc.images()[1];
        let mut patches = AttrPatches::default();
        patches.insert(
            img,
            vec![("href".to_string(), "a&b.png".to_string())],
        );
        let out = String::from_utf8(doc.to_patched_bytes(&patches).unwrap()).unwrap();
        assert!(out.contains(r#"href="a&amp;b.png""#));
    }

    #[test]
    fn test_unescapes_attribute_values_on_parse() {
        let doc =
            Document::parse(br#"<svg><image width="1" height="1" href="a&amp;b.png"/></svg>"#.to_vec())
                .unwrap();
        let img = doc.images()[0];
        assert_eq!(doc.element(img).attr("href"), Some("a&b.png"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(Document::parse(b"<svg><g></svg>".to_vec()).is_err());
    }
}
