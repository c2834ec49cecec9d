//! Declaration model shared by the parser, assembler and serializers

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a top-level declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Protocol,
    Category,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Class => write!(f, "class"),
            SymbolKind::Protocol => write!(f, "protocol"),
            SymbolKind::Category => write!(f, "category"),
        }
    }
}

/// Instance (`-`) or class (`+`) method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Instance,
    Class,
}

impl MethodKind {
    pub fn prefix(&self) -> char {
        match self {
            MethodKind::Instance => '-',
            MethodKind::Class => '+',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '-' => Some(MethodKind::Instance),
            '+' => Some(MethodKind::Class),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, MethodKind::Class)
    }
}

/// A method parameter: opaque type text plus the dumped argument name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub type_name: String,
    pub name: Option<String>,
}

/// One label of a selector. Unary selectors have a single part without a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorPart {
    pub label: String,
    pub param: Option<Param>,
}

/// Method declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub kind: MethodKind,
    pub return_type: String,
    pub parts: Vec<SelectorPart>,
    pub variadic: bool,
    pub line: usize,
}

impl MethodDecl {
    /// Selector text, e.g. `initWithFrame:style:` or `description`
    pub fn selector(&self) -> String {
        if !self.takes_arguments() {
            return self.parts.iter().map(|p| p.label.as_str()).collect();
        }
        let mut selector = String::new();
        for part in &self.parts {
            selector.push_str(&part.label);
            selector.push(':');
        }
        selector
    }

    pub fn takes_arguments(&self) -> bool {
        self.parts.iter().any(|p| p.param.is_some())
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.parts.iter().filter_map(|p| p.param.as_ref())
    }

    pub fn key(&self) -> MemberKey {
        MemberKey::Method {
            selector: self.selector(),
            is_class: self.kind.is_class(),
        }
    }
}

/// Property declaration; attributes are kept verbatim and in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub type_name: String,
    pub attributes: Vec<String>,
    pub line: usize,
}

impl PropertyDecl {
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.iter().any(|a| a == attr)
    }

    fn attribute_value(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find_map(|a| {
            let (k, v) = a.split_once('=')?;
            (k.trim() == key).then(|| v.trim())
        })
    }

    pub fn is_class_property(&self) -> bool {
        self.has_attribute("class")
    }

    pub fn is_readonly(&self) -> bool {
        self.has_attribute("readonly")
    }

    /// Getter selector (`getter=` attribute or the property name)
    pub fn getter(&self) -> String {
        self.attribute_value("getter")
            .map(str::to_string)
            .unwrap_or_else(|| self.name.clone())
    }

    /// Setter selector, `None` for readonly properties
    pub fn setter(&self) -> Option<String> {
        if self.is_readonly() {
            return None;
        }
        if let Some(custom) = self.attribute_value("setter") {
            return Some(custom.to_string());
        }
        let mut chars = self.name.chars();
        let first = chars.next()?;
        Some(format!("set{}{}:", first.to_uppercase(), chars.as_str()))
    }

    pub fn key(&self) -> MemberKey {
        MemberKey::Property {
            name: self.name.clone(),
            is_class: self.is_class_property(),
        }
    }
}

/// Instance variable from an `@interface { ... }` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvarDecl {
    pub name: String,
    pub type_name: String,
}

/// Identity of a member within its owning symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKey {
    Method { selector: String, is_class: bool },
    Property { name: String, is_class: bool },
    Ivar(String),
}

/// Members shared by classes, protocols and categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
}

impl Members {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.methods.is_empty()
    }
}

/// `@interface Name : Super <Protocols>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub protocols: IndexSet<String>,
    #[serde(flatten)]
    pub members: Members,
    pub ivars: Vec<IvarDecl>,
    /// Created from a category whose class was never defined
    pub placeholder: bool,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            protocols: IndexSet::new(),
            members: Members::default(),
            ivars: Vec::new(),
            placeholder: false,
        }
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            placeholder: true,
            ..Self::new(name)
        }
    }
}

/// `@protocol Name <Protocols>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDecl {
    pub name: String,
    pub protocols: IndexSet<String>,
    #[serde(flatten)]
    pub members: Members,
}

impl ProtocolDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocols: IndexSet::new(),
            members: Members::default(),
        }
    }
}

/// `@interface Class (Category) <Protocols>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDecl {
    pub class_name: String,
    /// Empty for class extensions (`@interface Foo ()`)
    pub category: Option<String>,
    pub protocols: IndexSet<String>,
    #[serde(flatten)]
    pub members: Members,
}

/// A top-level declaration as it appears in one header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    Class(ClassDecl),
    Protocol(ProtocolDecl),
    Category(CategoryDecl),
}

impl Declaration {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Declaration::Class(_) => SymbolKind::Class,
            Declaration::Protocol(_) => SymbolKind::Protocol,
            Declaration::Category(_) => SymbolKind::Category,
        }
    }

    /// Class, protocol, or the target class of a category
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(c) => &c.name,
            Declaration::Protocol(p) => &p.name,
            Declaration::Category(c) => &c.class_name,
        }
    }

    pub fn members(&self) -> &Members {
        match self {
            Declaration::Class(c) => &c.members,
            Declaration::Protocol(p) => &p.members,
            Declaration::Category(c) => &c.members,
        }
    }
}

/// `@class Name;` or `@protocol Name;`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForwardRef {
    Class(String),
    Protocol(String),
}

/// A symbol of the assembled framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Symbol {
    Class(ClassDecl),
    Protocol(ProtocolDecl),
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Class(_) => SymbolKind::Class,
            Symbol::Protocol(_) => SymbolKind::Protocol,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Class(c) => &c.name,
            Symbol::Protocol(p) => &p.name,
        }
    }

    pub fn members(&self) -> &Members {
        match self {
            Symbol::Class(c) => &c.members,
            Symbol::Protocol(p) => &p.members,
        }
    }

    pub fn protocols(&self) -> &IndexSet<String> {
        match self {
            Symbol::Class(c) => &c.protocols,
            Symbol::Protocol(p) => &p.protocols,
        }
    }

    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(self.kind(), self.name())
    }
}

/// Identity of a top-level symbol: kind plus name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub kind: SymbolKind,
    pub name: String,
}

impl SymbolKey {
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// The assembled, read-only symbol graph of one framework
#[derive(Debug, Clone, Serialize)]
pub struct Framework {
    name: String,
    symbols: Vec<Symbol>,
    #[serde(skip)]
    index: IndexMap<SymbolKey, usize>,
    forward_classes: IndexSet<String>,
    forward_protocols: IndexSet<String>,
}

impl Framework {
    /// Build the graph from symbols already in serialization order.
    /// Later symbols with an existing key are ignored.
    pub fn new(
        name: impl Into<String>,
        symbols: Vec<Symbol>,
        forward_classes: IndexSet<String>,
        forward_protocols: IndexSet<String>,
    ) -> Self {
        let mut index = IndexMap::with_capacity(symbols.len());
        let mut kept = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let key = symbol.key();
            if index.contains_key(&key) {
                continue;
            }
            index.insert(key, kept.len());
            kept.push(symbol);
        }

        Self {
            name: name.into(),
            symbols: kept,
            index,
            forward_classes,
            forward_protocols,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn get(&self, kind: SymbolKind, name: &str) -> Option<&Symbol> {
        let idx = self.index.get(&SymbolKey::new(kind, name))?;
        self.symbols.get(*idx)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        match self.get(SymbolKind::Class, name)? {
            Symbol::Class(c) => Some(c),
            Symbol::Protocol(_) => None,
        }
    }

    pub fn protocol(&self, name: &str) -> Option<&ProtocolDecl> {
        match self.get(SymbolKind::Protocol, name)? {
            Symbol::Protocol(p) => Some(p),
            Symbol::Class(_) => None,
        }
    }

    pub fn forward_classes(&self) -> &IndexSet<String> {
        &self.forward_classes
    }

    pub fn forward_protocols(&self) -> &IndexSet<String> {
        &self.forward_protocols
    }

    pub fn method_count(&self) -> usize {
        self.symbols.iter().map(|s| s.members().methods.len()).sum()
    }

    pub fn property_count(&self) -> usize {
        self.symbols.iter().map(|s| s.members().properties.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(kind: MethodKind, parts: &[(&str, Option<&str>)]) -> MethodDecl {
        MethodDecl {
            kind,
            return_type: "void".to_string(),
            parts: parts
                .iter()
                .map(|(label, ty)| SelectorPart {
                    label: label.to_string(),
                    param: ty.map(|t| Param {
                        type_name: t.to_string(),
                        name: None,
                    }),
                })
                .collect(),
            variadic: false,
            line: 1,
        }
    }

    fn property(name: &str, attrs: &[&str]) -> PropertyDecl {
        PropertyDecl {
            name: name.to_string(),
            type_name: "BOOL".to_string(),
            attributes: attrs.iter().map(|a| a.to_string()).collect(),
            line: 1,
        }
    }

    #[test]
    fn test_selector_text() {
        let unary = method(MethodKind::Instance, &[("description", None)]);
        assert_eq!(unary.selector(), "description");

        let keyword = method(MethodKind::Class, &[("initWithFrame", Some("CGRect")), ("style", Some("long long"))]);
        assert_eq!(keyword.selector(), "initWithFrame:style:");
        assert!(keyword.key() != unary.key());
    }

    #[test]
    fn test_anonymous_selector_part() {
        let m = method(MethodKind::Instance, &[("foo", Some("id")), ("", Some("id"))]);
        assert_eq!(m.selector(), "foo::");
    }

    #[test]
    fn test_property_accessors() {
        let plain = property("enabled", &["nonatomic"]);
        assert_eq!(plain.getter(), "enabled");
        assert_eq!(plain.setter().as_deref(), Some("setEnabled:"));

        let custom = property("on", &["getter=isOn", "setter=turnOn:"]);
        assert_eq!(custom.getter(), "isOn");
        assert_eq!(custom.setter().as_deref(), Some("turnOn:"));

        let readonly = property("count", &["readonly", "class"]);
        assert_eq!(readonly.setter(), None);
        assert!(readonly.is_class_property());
    }

    #[test]
    fn test_framework_lookup_ignores_duplicate_keys() {
        let mut first = ClassDecl::new("Foo");
        first.superclass = Some("NSObject".to_string());
        let second = ClassDecl::new("Foo");
        let framework = Framework::new(
            "Demo",
            vec![
                Symbol::Class(first),
                Symbol::Protocol(ProtocolDecl::new("Foo")),
                Symbol::Class(second),
            ],
            IndexSet::new(),
            IndexSet::new(),
        );

        assert_eq!(framework.symbols().len(), 2);
        assert_eq!(
            framework.class("Foo").and_then(|c| c.superclass.as_deref()),
            Some("NSObject")
        );
        assert!(framework.protocol("Foo").is_some());
    }
}
