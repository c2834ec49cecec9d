//! Output generators for assembled frameworks

use crate::encoding::{is_bool_type, method_encoding, CXX_DESTRUCT};
use objcat_core::{
    CatalogOptions, Error, Framework, MemberKey, MethodDecl, MethodKind, Param, PropertyDecl,
    Result, SelectorPart, Symbol, SymbolKind,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::collections::HashSet;

/// Catalog format version understood by the patching tool
pub const CATALOG_VERSION: &str = "1.2050000429153442";

const PLIST_DOCTYPE: &str =
    r#"plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd""#;

/// One method entry of a catalog record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub class_name: String,
    pub display_name: String,
    pub prefix: char,
    pub selector: String,
    pub type_encoding: String,
}

impl MethodRecord {
    pub fn new(owner: &str, method: &MethodDecl) -> Self {
        Self {
            class_name: owner.to_string(),
            display_name: display_name(method),
            prefix: method.kind.prefix(),
            selector: method.selector(),
            type_encoding: method_encoding(method),
        }
    }
}

/// One property entry of an extended catalog record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub attributes: String,
    pub name: String,
    pub type_name: String,
}

/// Catalog record for one class or protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub kind: SymbolKind,
    pub name: String,
    pub super_class_name: Option<String>,
    pub protocols: Vec<String>,
    pub properties: Vec<PropertyRecord>,
    pub methods: Vec<MethodRecord>,
}

impl SymbolRecord {
    /// Build the record for a symbol, synthesizing accessors when enabled
    pub fn from_symbol(symbol: &Symbol, options: &CatalogOptions) -> Self {
        let name = symbol.name().to_string();
        let members = symbol.members();

        let super_class_name = match symbol {
            Symbol::Class(class) => class.superclass.clone(),
            Symbol::Protocol(_) => Some("NSObject".to_string()),
        };

        let mut methods: Vec<MethodRecord> =
            members.methods.iter().map(|m| MethodRecord::new(&name, m)).collect();

        if options.synthesize_accessors {
            let mut seen: HashSet<MemberKey> = members.methods.iter().map(MethodDecl::key).collect();
            for accessor in members.properties.iter().flat_map(accessors) {
                if seen.insert(accessor.key()) {
                    methods.push(MethodRecord::new(&name, &accessor));
                }
            }
        }

        let properties = members
            .properties
            .iter()
            .map(|p| PropertyRecord {
                attributes: p.attributes.join(", "),
                name: p.name.clone(),
                type_name: p.type_name.clone(),
            })
            .collect();

        Self {
            kind: symbol.kind(),
            name,
            super_class_name,
            protocols: symbol.protocols().iter().cloned().collect(),
            properties,
            methods,
        }
    }
}

/// Getter, and setter unless readonly, for a declared property
fn accessors(property: &PropertyDecl) -> Vec<MethodDecl> {
    let kind = if property.is_class_property() {
        MethodKind::Class
    } else {
        MethodKind::Instance
    };

    let mut out = vec![MethodDecl {
        kind,
        return_type: property.type_name.clone(),
        parts: vec![SelectorPart {
            label: property.getter(),
            param: None,
        }],
        variadic: false,
        line: property.line,
    }];

    if let Some(setter) = property.setter() {
        out.push(MethodDecl {
            kind,
            return_type: "void".to_string(),
            parts: vec![SelectorPart {
                label: setter.trim_end_matches(':').to_string(),
                param: Some(Param {
                    type_name: property.type_name.clone(),
                    name: None,
                }),
            }],
            variadic: false,
            line: property.line,
        });
    }
    out
}

/// `-(ret) sel` or `-(ret) part:(type) part2:(type)`
pub fn display_name(method: &MethodDecl) -> String {
    let prefix = method.kind.prefix();
    let selector = method.selector();
    if selector == CXX_DESTRUCT {
        return format!("{}(void) {}", prefix, CXX_DESTRUCT);
    }

    let ret = if is_bool_type(&method.return_type) {
        "bool"
    } else if method.return_type.contains("Protocol") {
        "Protocol *"
    } else {
        method.return_type.as_str()
    };

    if !method.takes_arguments() {
        return format!("{}({}) {}", prefix, ret, selector);
    }

    let parts = method
        .parts
        .iter()
        .map(|part| {
            let ty = part.param.as_ref().map(|p| p.type_name.as_str()).unwrap_or("id");
            let ty = if is_bool_type(ty) { "bool" } else { ty };
            format!("{}:({})", part.label, ty)
        })
        .collect::<Vec<_>>()
        .join(" ");

    if method.variadic {
        format!("{}({}) {}, ...", prefix, ret, parts)
    } else {
        format!("{}({}) {}", prefix, ret, parts)
    }
}

/// Check that text is representable in XML 1.0. Returns the first character
/// that is not.
pub fn check_text(text: &str) -> std::result::Result<(), char> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(bad) => Err(bad),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{FFFE}' | '\u{FFFF}' => false,
        c => c >= ' ',
    }
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}

/// Tab-indented plist writer over `quick_xml`
struct PlistWriter {
    xml: Writer<Vec<u8>>,
}

impl PlistWriter {
    fn new() -> Result<Self> {
        let mut w = Self {
            xml: Writer::new_with_indent(Vec::with_capacity(64 * 1024), b'\t', 1),
        };
        w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        w.event(Event::DocType(BytesText::from_escaped(PLIST_DOCTYPE)))?;
        w.event(Event::Start(
            BytesStart::new("plist").with_attributes([("version", "1.0")]),
        ))?;
        Ok(w)
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.xml.write_event(event).map_err(xml_error)
    }

    fn open(&mut self, tag: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(tag)))
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn empty(&mut self, tag: &str) -> Result<()> {
        self.event(Event::Empty(BytesStart::new(tag)))
    }

    fn text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return self.empty(tag);
        }
        self.open(tag)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(tag)
    }

    fn key(&mut self, key: &str) -> Result<()> {
        self.text_element("key", key)
    }

    fn string(&mut self, value: &str, symbol: &str, field: &str) -> Result<()> {
        check_text(value).map_err(|ch| Error::serialization(symbol, field, ch))?;
        self.text_element("string", value)
    }

    fn keyed_string(&mut self, key: &str, value: &str, symbol: &str, field: &str) -> Result<()> {
        self.key(key)?;
        self.string(value, symbol, field)
    }

    fn finish(mut self) -> Result<String> {
        self.close("plist")?;
        String::from_utf8(self.xml.into_inner()).map_err(xml_error)
    }
}

/// `.extracted` catalog generator
pub struct CatalogGenerator;

impl CatalogGenerator {
    /// Records in serialization order, empty symbols dropped unless asked for
    pub fn records(framework: &Framework, options: &CatalogOptions) -> Vec<SymbolRecord> {
        framework
            .symbols()
            .iter()
            .map(|s| SymbolRecord::from_symbol(s, options))
            .filter(|r| options.include_empty || !r.methods.is_empty())
            .collect()
    }

    /// Render the full catalog document
    pub fn generate(framework: &Framework, options: &CatalogOptions) -> Result<String> {
        let records = Self::records(framework, options);
        let mut w = PlistWriter::new()?;

        w.open("dict")?;
        w.key("objcClasses")?;
        if records.is_empty() {
            w.empty("array")?;
        } else {
            w.open("array")?;
            for record in &records {
                Self::write_record(&mut w, record, options)?;
            }
            w.close("array")?;
        }
        w.key("version")?;
        w.text_element("real", CATALOG_VERSION)?;
        w.close("dict")?;

        w.finish()
    }

    fn write_record(w: &mut PlistWriter, record: &SymbolRecord, options: &CatalogOptions) -> Result<()> {
        let symbol = record.name.as_str();
        let extended = options.extended_records;

        w.open("dict")?;
        if extended {
            w.keyed_string("kind", &record.kind.to_string(), symbol, "kind")?;
        }

        w.key("methods")?;
        if record.methods.is_empty() {
            w.empty("array")?;
        } else {
            w.open("array")?;
            for (i, method) in record.methods.iter().enumerate() {
                Self::write_method(w, method, symbol, i)?;
            }
            w.close("array")?;
        }

        w.keyed_string("name", &record.name, symbol, "name")?;

        if extended && !record.properties.is_empty() {
            w.key("properties")?;
            w.open("array")?;
            for (i, property) in record.properties.iter().enumerate() {
                let field = |f: &str| format!("properties[{}].{}", i, f);
                w.open("dict")?;
                w.keyed_string("attributes", &property.attributes, symbol, &field("attributes"))?;
                w.keyed_string("name", &property.name, symbol, &field("name"))?;
                w.keyed_string("type", &property.type_name, symbol, &field("type"))?;
                w.close("dict")?;
            }
            w.close("array")?;
        }

        if extended && !record.protocols.is_empty() {
            w.key("protocols")?;
            w.open("array")?;
            for (i, protocol) in record.protocols.iter().enumerate() {
                w.string(protocol, symbol, &format!("protocols[{}]", i))?;
            }
            w.close("array")?;
        }

        if let Some(superclass) = &record.super_class_name {
            w.keyed_string("superClassName", superclass, symbol, "superClassName")?;
        }
        w.close("dict")
    }

    fn write_method(w: &mut PlistWriter, method: &MethodRecord, symbol: &str, index: usize) -> Result<()> {
        let field = |f: &str| format!("methods[{}].{}", index, f);
        w.open("dict")?;
        w.keyed_string("className", &method.class_name, symbol, &field("className"))?;
        w.keyed_string("displayName", &method.display_name, symbol, &field("displayName"))?;
        w.keyed_string("prefix", &method.prefix.to_string(), symbol, &field("prefix"))?;
        w.keyed_string("selector", &method.selector, symbol, &field("selector"))?;
        w.keyed_string("typeEncoding", &method.type_encoding, symbol, &field("typeEncoding"))?;
        w.close("dict")
    }
}

/// JSON dump of the assembled model
#[derive(Debug, Serialize)]
pub struct ModelJson<'a> {
    pub format_version: u32,
    #[serde(flatten)]
    pub framework: &'a Framework,
}

impl<'a> ModelJson<'a> {
    pub fn new(framework: &'a Framework) -> Self {
        Self {
            format_version: 1,
            framework,
        }
    }

    pub fn generate(framework: &Framework) -> Result<String> {
        serde_json::to_string_pretty(&ModelJson::new(framework))
            .map_err(|e| Error::parse(e.to_string()))
    }
}
