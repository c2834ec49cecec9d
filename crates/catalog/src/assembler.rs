//! Symbol model assembler - merges per-file declarations into one framework

use indexmap::{IndexMap, IndexSet};
use objcat_core::{
    CategoryDecl, ClassDecl, Declaration, ForwardRef, Framework, MemberKey, Members, ProtocolDecl,
    Symbol, SymbolKey, SymbolKind,
};
use objcat_headers::HeaderFile;
use std::collections::HashSet;
use tracing::{debug, info, warn};

struct Entry {
    symbol: Symbol,
    /// Order in which the symbol was first fully defined
    defined: Option<usize>,
    member_keys: HashSet<MemberKey>,
}

impl Entry {
    fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            defined: None,
            member_keys: HashSet::new(),
        }
    }
}

/// Incremental builder for a [`Framework`]. Feed declarations in scan order,
/// then call [`Assembler::finish`].
pub struct Assembler {
    name: String,
    entries: IndexMap<SymbolKey, Entry>,
    next_definition: usize,
    forward_classes: IndexSet<String>,
    forward_protocols: IndexSet<String>,
    duplicate_members: usize,
}

impl Assembler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
            next_definition: 0,
            forward_classes: IndexSet::new(),
            forward_protocols: IndexSet::new(),
            duplicate_members: 0,
        }
    }

    /// Merge everything one parsed header produced, fatal or not
    pub fn add_file(&mut self, file: &HeaderFile) {
        debug!(
            "Merging {} declarations from {:?}",
            file.parsed.declarations.len(),
            file.path
        );
        for decl in &file.parsed.declarations {
            self.add_declaration(decl.clone());
        }
        for fwd in &file.parsed.forward_refs {
            self.add_forward_ref(fwd);
        }
    }

    pub fn add_forward_ref(&mut self, fwd: &ForwardRef) {
        match fwd {
            ForwardRef::Class(name) => self.forward_classes.insert(name.clone()),
            ForwardRef::Protocol(name) => self.forward_protocols.insert(name.clone()),
        };
    }

    pub fn add_declaration(&mut self, decl: Declaration) {
        match decl {
            Declaration::Class(class) => self.add_class(class),
            Declaration::Protocol(protocol) => self.add_protocol(protocol),
            Declaration::Category(category) => self.add_category(category),
        }
    }

    fn add_class(&mut self, class: ClassDecl) {
        let key = SymbolKey::new(SymbolKind::Class, class.name.clone());
        let seq = self.next_definition;

        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Entry::new(Symbol::Class(ClassDecl::new(class.name.clone()))));
        let newly_defined = entry.defined.is_none();
        if newly_defined {
            entry.defined = Some(seq);
        }

        let Symbol::Class(target) = &mut entry.symbol else {
            return;
        };
        if newly_defined {
            target.superclass = class.superclass;
            target.placeholder = false;
        } else if class.superclass.is_some() && class.superclass != target.superclass {
            warn!(
                "Conflicting superclass for {}: keeping {:?}, ignoring {:?}",
                target.name, target.superclass, class.superclass
            );
        }
        target.protocols.extend(class.protocols);

        for ivar in class.ivars {
            if entry.member_keys.insert(MemberKey::Ivar(ivar.name.clone())) {
                target.ivars.push(ivar);
            } else {
                self.duplicate_members += 1;
            }
        }
        self.duplicate_members += merge_members(&mut target.members, &mut entry.member_keys, class.members);

        if newly_defined {
            self.next_definition += 1;
        }
    }

    fn add_protocol(&mut self, protocol: ProtocolDecl) {
        let key = SymbolKey::new(SymbolKind::Protocol, protocol.name.clone());
        let seq = self.next_definition;

        let entry = self.entries.entry(key).or_insert_with(|| {
            Entry::new(Symbol::Protocol(ProtocolDecl::new(protocol.name.clone())))
        });
        if entry.defined.is_none() {
            entry.defined = Some(seq);
            self.next_definition += 1;
        }

        let Symbol::Protocol(target) = &mut entry.symbol else {
            return;
        };
        target.protocols.extend(protocol.protocols);
        self.duplicate_members +=
            merge_members(&mut target.members, &mut entry.member_keys, protocol.members);
    }

    fn add_category(&mut self, category: CategoryDecl) {
        let key = SymbolKey::new(SymbolKind::Class, category.class_name.clone());
        if !self.entries.contains_key(&key) {
            debug!("Creating placeholder class {} for a category", category.class_name);
        }
        let entry = self.entries.entry(key).or_insert_with(|| {
            Entry::new(Symbol::Class(ClassDecl::placeholder(category.class_name.clone())))
        });

        let Symbol::Class(target) = &mut entry.symbol else {
            return;
        };
        target.protocols.extend(category.protocols);
        self.duplicate_members +=
            merge_members(&mut target.members, &mut entry.member_keys, category.members);
    }

    /// Freeze the graph: defined symbols in definition order, then
    /// placeholders that never got a definition, in creation order.
    pub fn finish(self) -> Framework {
        let mut defined = Vec::new();
        let mut orphans = Vec::new();
        for (_, entry) in self.entries {
            match entry.defined {
                Some(seq) => defined.push((seq, entry.symbol)),
                None => orphans.push(entry.symbol),
            }
        }
        defined.sort_by_key(|(seq, _)| *seq);

        let orphan_count = orphans.len();
        let symbols: Vec<Symbol> = defined
            .into_iter()
            .map(|(_, symbol)| symbol)
            .chain(orphans)
            .collect();

        let framework = Framework::new(self.name, symbols, self.forward_classes, self.forward_protocols);
        info!(
            "Assembled {}: {} symbols ({} category-only), {} methods, {} properties",
            framework.name(),
            framework.symbols().len(),
            orphan_count,
            framework.method_count(),
            framework.property_count()
        );
        if self.duplicate_members > 0 {
            debug!("Dropped {} duplicate members", self.duplicate_members);
        }
        framework
    }
}

/// Append members whose keys are new; returns how many were dropped
fn merge_members(target: &mut Members, keys: &mut HashSet<MemberKey>, incoming: Members) -> usize {
    let mut dropped = 0;
    for property in incoming.properties {
        if keys.insert(property.key()) {
            target.properties.push(property);
        } else {
            dropped += 1;
        }
    }
    for method in incoming.methods {
        if keys.insert(method.key()) {
            target.methods.push(method);
        } else {
            dropped += 1;
        }
    }
    dropped
}

/// Merge parsed headers, in the given order, into one framework
pub fn assemble(name: &str, files: &[HeaderFile]) -> Framework {
    let mut assembler = Assembler::new(name);
    for file in files {
        assembler.add_file(file);
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use objcat_headers::parse_header;

    fn framework(sources: &[&str]) -> Framework {
        let mut assembler = Assembler::new("Test");
        for source in sources {
            let parsed = parse_header(source);
            for decl in parsed.declarations {
                assembler.add_declaration(decl);
            }
            for fwd in &parsed.forward_refs {
                assembler.add_forward_ref(fwd);
            }
        }
        assembler.finish()
    }

    fn selectors(class: &ClassDecl) -> Vec<String> {
        class.members.methods.iter().map(|m| m.selector()).collect()
    }

    #[test]
    fn test_category_without_class_creates_placeholder() {
        let fw = framework(&["@interface Foo (Extras)\n- (void)bar;\n@end"]);
        let foo = fw.class("Foo").unwrap();
        assert!(foo.placeholder);
        assert_eq!(foo.superclass, None);
        assert_eq!(selectors(foo), vec!["bar"]);
    }

    #[test]
    fn test_category_members_follow_class_members() {
        let fw = framework(&[
            "@interface Foo : NSObject\n- (void)a;\n@end",
            "@interface Foo (More) <Extra>\n- (void)b;\n- (void)a;\n@end",
        ]);
        let foo = fw.class("Foo").unwrap();
        assert_eq!(selectors(foo), vec!["a", "b"]);
        assert!(foo.protocols.contains("Extra"));
        assert!(!foo.placeholder);
    }

    #[test]
    fn test_definition_after_category_fills_placeholder() {
        let fw = framework(&[
            "@interface Foo (Early)\n- (void)early;\n@end",
            "@interface Foo : UIView\n- (void)late;\n@end",
        ]);
        let foo = fw.class("Foo").unwrap();
        assert!(!foo.placeholder);
        assert_eq!(foo.superclass.as_deref(), Some("UIView"));
        assert_eq!(selectors(foo), vec!["early", "late"]);
    }

    #[test]
    fn test_duplicate_definitions_first_wins() {
        let fw = framework(&[
            "@interface Foo : NSObject\n- (void)a;\n+ (void)a;\n@end",
            "@interface Foo : NSProxy\n- (void)a;\n- (void)c;\n@end",
        ]);
        assert_eq!(fw.symbols().len(), 1);
        let foo = fw.class("Foo").unwrap();
        assert_eq!(foo.superclass.as_deref(), Some("NSObject"));
        assert_eq!(selectors(foo), vec!["a", "a", "c"]);
        assert!(foo.members.methods[1].kind.is_class());
    }

    #[test]
    fn test_symbol_order_puts_orphans_last() {
        let fw = framework(&[
            "@interface Orphan (X)\n- (void)x;\n@end\n@interface Late (Y)\n- (void)y;\n@end",
            "@protocol P\n- (void)p;\n@end\n@interface B : NSObject\n@end",
            "@interface Late : NSObject\n@end\n@interface A : NSObject\n@end",
        ]);
        let names: Vec<_> = fw.symbols().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["P", "B", "Late", "A", "Orphan"]);
    }

    #[test]
    fn test_class_and_protocol_may_share_a_name() {
        let fw = framework(&[
            "@protocol NSObject\n- (id)self;\n@end\n@interface NSObject <NSObject>\n@end",
        ]);
        assert_eq!(fw.symbols().len(), 2);
        assert!(fw.class("NSObject").is_some());
        assert!(fw.protocol("NSObject").is_some());
    }

    #[test]
    fn test_properties_and_ivars_deduplicated() {
        let fw = framework(&[
            "@interface Foo : NSObject { int _x; }\n@property int x;\n@property(class) int x;\n@end",
            "@interface Foo : NSObject { int _x; int _y; }\n@property int x;\n@end",
        ]);
        let foo = fw.class("Foo").unwrap();
        assert_eq!(foo.members.properties.len(), 2);
        let ivars: Vec<_> = foo.ivars.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(ivars, vec!["_x", "_y"]);
    }

    #[test]
    fn test_forward_refs_collected() {
        let fw = framework(&["@class A, B;\n@protocol P;\n", "@class A;\n"]);
        assert_eq!(fw.forward_classes().len(), 2);
        assert!(fw.forward_protocols().contains("P"));
        assert!(fw.symbols().is_empty());
    }
}
