//! Objective-C runtime type encodings synthesized from dumped type text.
//!
//! Headers only carry source-level types, so the encodings are heuristic: a
//! table of well-known selectors, block and struct shapes, then scalar and
//! pointer rules. The frame is `16 + 8 * argc` bytes with `self` at 0, `_cmd`
//! at 8 and arguments from 16 in 8-byte slots.

use objcat_core::MethodDecl;

/// Selector of the compiler-generated ivar destructor
pub const CXX_DESTRUCT: &str = ".cxx_destruct";

const FRAME_BASE: usize = 16;
const SLOT: usize = 8;

/// Encoding for one method
pub fn method_encoding(method: &MethodDecl) -> String {
    let selector = method.selector();
    if selector == CXX_DESTRUCT {
        return "v16@0:8".to_string();
    }
    if let Some(known) = known_selector(&selector) {
        return known.to_string();
    }

    if method.takes_arguments() {
        let params: Vec<&str> = method
            .parts
            .iter()
            .map(|part| part.param.as_ref().map(|p| p.type_name.as_str()).unwrap_or("id"))
            .collect();
        keyword_encoding(&method.return_type, &params)
    } else {
        unary_encoding(&method.return_type)
    }
}

fn known_selector(selector: &str) -> Option<&'static str> {
    let encoding = match selector {
        "dealloc" | "release" => "v16@0:8",
        "retain" | "autorelease" | "init" | "new" | "alloc" => "@16@0:8",
        "description" | "debugDescription" => "@16@0:8",
        "isEqual:" | "isLogFile:" | "isInSet:" => "B24@0:8@16",
        "hash" => "Q16@0:8",
        "class" | "superclass" => "#16@0:8",
        "conformsToProtocol:" => "B24@0:8^#16",
        "isKindOfClass:" => "B24@0:8#16",
        "respondsToSelector:" => "B24@0:8:16",
        "copyWithZone:" | "mutableCopyWithZone:" => "@24@0:8^{_NSZone=}16",
        _ => return None,
    };
    Some(encoding)
}

/// `_Bool`, `BOOL`, `bool` in any case
pub fn is_bool_type(type_name: &str) -> bool {
    matches!(
        type_name.trim().to_ascii_lowercase().as_str(),
        "_bool" | "bool" | "bool_"
    )
}

/// Keyword selectors: one scalar code per argument, everything else is `@`
fn keyword_encoding(return_type: &str, params: &[&str]) -> String {
    let ret = match return_type.trim() {
        "void" => 'v',
        t if is_bool_type(t) => 'B',
        "int" => 'i',
        "long" => 'q',
        "float" => 'f',
        "double" => 'd',
        _ => '@',
    };

    let mut encoding = format!("{}{}@0:8", ret, FRAME_BASE + SLOT * params.len());
    for (i, param) in params.iter().enumerate() {
        encoding.push(argument_code(param));
        encoding.push_str(&(FRAME_BASE + SLOT * i).to_string());
    }
    encoding
}

fn argument_code(type_name: &str) -> char {
    if is_bool_type(type_name) {
        return 'B';
    }
    match type_name.trim().to_ascii_lowercase().as_str() {
        "int" | "nsinteger" => 'i',
        "long" | "long long" | "nsuinteger" => 'q',
        "float" | "cgfloat" => 'f',
        "double" => 'd',
        _ => '@',
    }
}

/// Unary selectors: the return type alone decides the encoding
fn unary_encoding(return_type: &str) -> String {
    let return_type = match return_type.trim() {
        "_Bool" => "bool",
        "instancetype" => "id",
        other => other,
    };

    if return_type.contains('^') || return_type.contains("CDUnknownBlockType") {
        return block_encoding(return_type).to_string();
    }

    let code = struct_code(return_type)
        .map(str::to_string)
        .unwrap_or_else(|| scalar_or_pointer_code(return_type));
    format!("{}{}@0:8", code, FRAME_BASE)
}

fn block_encoding(return_type: &str) -> &'static str {
    if return_type.contains("(void (^)(_Bool))") || return_type.contains("(void (^)(BOOL))") {
        "v32@0:8@?16@24"
    } else if return_type.contains("(void (^)(void))") {
        "v24@0:8@?16"
    } else if return_type.contains("(void (^)(id))") || return_type.contains("CDUnknownBlockType") {
        "v32@0:8@?16@24"
    } else if return_type.starts_with("_Bool (^)") || return_type.starts_with("BOOL (^)") {
        "B32@0:8@?16@24"
    } else {
        "@32@0:8@?16@24"
    }
}

fn struct_code(type_name: &str) -> Option<&'static str> {
    let code = match type_name {
        "CGRect" => "{CGRect={CGPoint=dd}{CGSize=dd}}",
        "CGPoint" => "{CGPoint=dd}",
        "CGSize" => "{CGSize=dd}",
        "NSRange" => "{_NSRange=QQ}",
        "UIEdgeInsets" => "{UIEdgeInsets=dddd}",
        "CGAffineTransform" => "{CGAffineTransform=dddddd}",
        "struct _NSZone *" | "_NSZone *" => "^{_NSZone=}",
        "Protocol *" => "^#",
        "id<Protocol>" => "@",
        _ => return None,
    };
    Some(code)
}

fn scalar_or_pointer_code(type_name: &str) -> String {
    if let Some(base) = type_name.strip_suffix("**") {
        let (is_const, base) = strip_const(base);
        let object = is_framework_object(&base);
        let code = match (is_const, object) {
            (true, true) => "r^@",
            (true, false) => "r^^",
            (false, true) => "^@",
            (false, false) => "^^",
        };
        return code.to_string();
    }

    if let Some(known) = scalar_code(type_name) {
        return known.to_string();
    }

    if let Some(base) = type_name.strip_suffix('*') {
        let (is_const, base) = strip_const(base);
        let code = if is_framework_object(&base) {
            if is_const { "r@" } else { "@" }
        } else if is_const {
            if base == "char" { "r*" } else { "r^" }
        } else {
            "^"
        };
        return code.to_string();
    }

    "@".to_string()
}

fn scalar_code(type_name: &str) -> Option<&'static str> {
    let code = match type_name {
        "void" => "v",
        "BOOL" | "bool" | "_Bool" | "Bool" | "bool_" => "B",
        "double" => "d",
        "long long" | "long" => "q",
        "unsigned long long" => "Q",
        "unsigned int" => "I",
        "int" => "i",
        "float" => "f",
        "id" => "@",
        "Class" => "#",
        "SEL" => ":",
        "char *" => "*",
        "const char *" => "r*",
        "void *" => "^v",
        "IMP" => "^?",
        "id *" | "NSError **" => "^@",
        "CDUnknownBlockType" | "dispatch_block_t" => "@?",
        _ => return None,
    };
    Some(code)
}

fn strip_const(base: &str) -> (bool, String) {
    let base = base.trim_end_matches(['*', ' ']).trim();
    if base.contains("const") {
        (true, base.replace("const", "").trim().to_string())
    } else {
        (false, base.to_string())
    }
}

fn is_framework_object(base: &str) -> bool {
    base.starts_with("NS") || base.starts_with("UI")
}
