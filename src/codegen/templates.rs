//! Format templates, keyed by node tag or token kind.
//!
//! Escapes understood by the engine:
//!
//! | escape     | effect                                                      |
//! |------------|-------------------------------------------------------------|
//! | `%c`       | generate the child named by the next [`Arg::Child`]          |
//! | `%p`       | as `%c`, parenthesized when the child is a compound expression |
//! | `%C`       | generate children `[low, high)` of the next [`Arg::Range`], joined by its separator |
//! | `%,`       | a comma if the last `%C` produced exactly one item           |
//! | `%\|`      | the current indentation                                     |
//! | `%+`, `%-` | one level more or less indentation                           |
//! | `%{pattr}` | the token's display operand                                  |
//! | `%{name}`  | the display operand without its quotes                       |
//! | `%[n]`     | prefix: apply the escape to child `n` instead                |
//! | `%%`       | a literal `%`                                               |
//!
//! Negative indices count from the end of the child list.

use crate::bytecode::op::{Family, Variant};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Upper range bound meaning "through the last child".
pub const END: isize = isize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    Child(isize),
    Range(isize, isize, &'static str),
}

use Arg::{Child, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub pattern: &'static str,
    pub args: &'static [Arg],
}

const fn t(pattern: &'static str, args: &'static [Arg]) -> Template {
    Template { pattern, args }
}

/// Template for a node tag or token kind.
pub fn direct(key: &str) -> Option<&'static Template> {
    DIRECT.get(key)
}

/// Template for a `stmt`, `designator` or `expr` node, chosen by the kind
/// of its last child.
pub fn shape(last: &str) -> Option<&'static Template> {
    SHAPES.get(last).or_else(|| variant(last))
}

// =============================================================================
// Variable-arity kinds
// =============================================================================

const BUILD_LIST: Template = t("[%C]", &[Range(0, -1, ", ")]);
const BUILD_TUPLE: Template = t("(%C%,)", &[Range(0, -1, ", ")]);
const BUILD_SLICE: Template = t("%C", &[Range(0, -1, ":")]);
const CALL: Template = t("%p(%C)", &[Child(0), Range(1, -1, ", ")]);

const CALL_VAR_ONLY: Template = t("%p(*%c)", &[Child(0), Child(-2)]);
const CALL_VAR: Template = t("%p(%C, *%c)", &[Child(0), Range(1, -2, ", "), Child(-2)]);
const CALL_KW_ONLY: Template = t("%p(**%c)", &[Child(0), Child(-2)]);
const CALL_KW: Template = t("%p(%C, **%c)", &[Child(0), Range(1, -2, ", "), Child(-2)]);
const CALL_VAR_KW_ONLY: Template = t("%p(*%c, **%c)", &[Child(0), Child(-3), Child(-2)]);
const CALL_VAR_KW: Template = t(
    "%p(%C, *%c, **%c)",
    &[Child(0), Range(1, -3, ", "), Child(-3), Child(-2)],
);

/// Templates for kinds such as `BUILD_LIST_3` or `CALL_FUNCTION_KW_1`,
/// picked from family and arity without touching any table.
fn variant(kind: &str) -> Option<&'static Template> {
    let variant = Variant::parse(kind)?;
    let bare = variant.arity == 0;
    Some(match variant.family {
        Family::BuildList => &BUILD_LIST,
        Family::BuildTuple => &BUILD_TUPLE,
        Family::BuildSlice => &BUILD_SLICE,
        Family::CallFunction => &CALL,
        Family::CallFunctionVar if bare => &CALL_VAR_ONLY,
        Family::CallFunctionVar => &CALL_VAR,
        Family::CallFunctionKw if bare => &CALL_KW_ONLY,
        Family::CallFunctionKw => &CALL_KW,
        Family::CallFunctionVarKw if bare => &CALL_VAR_KW_ONLY,
        Family::CallFunctionVarKw => &CALL_VAR_KW,
        Family::UnpackSequence | Family::MakeFunction | Family::DupTopX => return None,
    })
}

// =============================================================================
// Shape table
// =============================================================================

static SHAPES: Lazy<HashMap<&'static str, Template>> = Lazy::new(|| {
    HashMap::from([
        ("STORE_ATTR", t("%p.%[1]{pattr}", &[Child(0)])),
        ("STORE_SLICE+0", t("%p[:]", &[Child(0)])),
        ("STORE_SLICE+1", t("%p[%c:]", &[Child(0), Child(1)])),
        ("STORE_SLICE+2", t("%p[:%c]", &[Child(0), Child(1)])),
        ("STORE_SLICE+3", t("%p[%c:%c]", &[Child(0), Child(1), Child(2)])),
        ("DELETE_SLICE+0", t("%|del %p[:]\n", &[Child(0)])),
        ("DELETE_SLICE+1", t("%|del %p[%c:]\n", &[Child(0), Child(1)])),
        ("DELETE_SLICE+2", t("%|del %p[:%c]\n", &[Child(0), Child(1)])),
        ("DELETE_SLICE+3", t("%|del %p[%c:%c]\n", &[Child(0), Child(1), Child(2)])),
        ("DELETE_ATTR", t("%|del %p.%[-1]{pattr}\n", &[Child(0)])),
        ("BINARY_SUBSCR", t("%p[%c]", &[Child(0), Child(1)])),
        ("UNARY_POSITIVE", t("+%p", &[Child(0)])),
        ("UNARY_NEGATIVE", t("-%p", &[Child(0)])),
        ("UNARY_CONVERT", t("`%c`", &[Child(0)])),
        ("UNARY_INVERT", t("~%p", &[Child(0)])),
        ("UNARY_NOT", t("not %p", &[Child(0)])),
        ("SLICE+0", t("%p[:]", &[Child(0)])),
        ("SLICE+1", t("%p[%c:]", &[Child(0), Child(1)])),
        ("SLICE+2", t("%p[:%c]", &[Child(0), Child(1)])),
        ("SLICE+3", t("%p[%c:%c]", &[Child(0), Child(1), Child(2)])),
        ("LOAD_ATTR", t("%p%c", &[Child(0), Child(1)])),
    ])
});

// =============================================================================
// Direct table
// =============================================================================

static DIRECT: Lazy<HashMap<&'static str, Template>> = Lazy::new(|| {
    HashMap::from([
        // operators
        ("BINARY_ADD", t("+", &[])),
        ("BINARY_SUBTRACT", t("-", &[])),
        ("BINARY_MULTIPLY", t("*", &[])),
        ("BINARY_DIVIDE", t("/", &[])),
        ("BINARY_MODULO", t("%%", &[])),
        ("BINARY_POWER", t("**", &[])),
        ("BINARY_LSHIFT", t("<<", &[])),
        ("BINARY_RSHIFT", t(">>", &[])),
        ("BINARY_AND", t("&", &[])),
        ("BINARY_OR", t("|", &[])),
        ("BINARY_XOR", t("^", &[])),
        ("INPLACE_ADD", t("+=", &[])),
        ("INPLACE_SUBTRACT", t("-=", &[])),
        ("INPLACE_MULTIPLY", t("*=", &[])),
        ("INPLACE_DIVIDE", t("/=", &[])),
        ("INPLACE_MODULO", t("%%=", &[])),
        ("INPLACE_POWER", t("**=", &[])),
        ("INPLACE_LSHIFT", t("<<=", &[])),
        ("INPLACE_RSHIFT", t(">>=", &[])),
        ("INPLACE_AND", t("&=", &[])),
        ("INPLACE_OR", t("|=", &[])),
        ("INPLACE_XOR", t("^=", &[])),
        // names
        ("IMPORT_FROM", t("%{pattr}", &[])),
        ("LOAD_ATTR", t(".%{pattr}", &[])),
        ("LOAD_FAST", t("%{pattr}", &[])),
        ("LOAD_NAME", t("%{pattr}", &[])),
        ("LOAD_GLOBAL", t("%{pattr}", &[])),
        ("LOAD_LOCALS", t("locals()", &[])),
        ("STORE_FAST", t("%{pattr}", &[])),
        ("STORE_NAME", t("%{pattr}", &[])),
        ("STORE_GLOBAL", t("%{pattr}", &[])),
        ("DELETE_FAST", t("%|del %{pattr}\n", &[])),
        ("DELETE_NAME", t("%|del %{pattr}\n", &[])),
        ("DELETE_GLOBAL", t("%|del %{pattr}\n", &[])),
        // expressions
        ("binary_expr", t("%p %c %p", &[Child(0), Child(-1), Child(1)])),
        ("binary_subscr", t("%p[%c]", &[Child(0), Child(1)])),
        ("store_subscr", t("%p[%c]", &[Child(0), Child(1)])),
        ("subscript_tuple", t("%C", &[Range(0, -1, ", ")])),
        ("unpack", t("(%C%,)", &[Range(1, END, ", ")])),
        ("list_compr", t("[%c%C]", &[Child(0), Range(1, END, "")])),
        ("comp_for", t(" for %c in %c", &[Child(0), Child(1)])),
        ("comp_if", t(" if %c", &[Child(0)])),
        ("and", t("%p and %p", &[Child(0), Child(3)])),
        ("or", t("%p or %p", &[Child(0), Child(3)])),
        ("compare", t("%p %[-1]{pattr} %p", &[Child(0), Child(1)])),
        ("cmp_list", t("%p %c", &[Child(0), Child(1)])),
        ("cmp_list1", t("%[3]{pattr} %p %c", &[Child(0), Child(-2)])),
        ("cmp_list2", t("%[1]{pattr} %p", &[Child(0)])),
        ("kwarg", t("%[0]{name}=%c", &[Child(1)])),
        ("kv", t("%c: %c", &[Child(3), Child(1)])),
        ("mapexpr", t("{%[1]C}", &[Range(0, END, ", ")])),
        ("return_lambda", t("%c", &[Child(0)])),
        // simple statements
        ("assign", t("%|%c = %c\n", &[Child(-1), Child(0)])),
        ("augassign1", t("%|%c %c %c\n", &[Child(0), Child(2), Child(1)])),
        ("augassign2", t("%|%c%c %c %c\n", &[Child(0), Child(2), Child(-3), Child(-4)])),
        ("designList", t("%c = %c", &[Child(0), Child(-1)])),
        ("delete_subscr", t("%|del %p[%c]\n", &[Child(0), Child(1)])),
        ("importstmt2", t("%|import %c\n", &[Child(1)])),
        ("importstar2", t("%|from %[1]{pattr} import *\n", &[])),
        ("importfrom2", t("%|from %[1]{pattr} import %c\n", &[Child(2)])),
        ("importlist2", t("%C", &[Range(0, END, ", ")])),
        ("assert", t("%|assert %c\n", &[Child(3)])),
        ("assert2", t("%|assert %c, %c\n", &[Child(3), Child(-5)])),
        ("print_stmt", t("%|print %c,\n", &[Child(0)])),
        ("print_items", t("%|print %C,\n", &[Range(0, END, ", ")])),
        ("print_items_nl", t("%|print %C\n", &[Range(0, END, ", ")])),
        ("print_nl_stmt", t("%|print\n", &[])),
        ("print_to", t("%|print >> %c, %c,\n", &[Child(0), Child(1)])),
        ("print_to_nl", t("%|print >> %c, %c\n", &[Child(0), Child(1)])),
        ("print_nl_to", t("%|print >> %c\n", &[Child(0)])),
        ("print_to_items", t("%C", &[Range(0, END, ", ")])),
        ("print_to_item", t("%c", &[Child(1)])),
        ("call_stmt", t("%|%c\n", &[Child(0)])),
        ("break_stmt", t("%|break\n", &[])),
        ("continue_stmt", t("%|continue\n", &[])),
        ("passstmt", t("%|pass\n", &[])),
        // compound statements
        ("ifstmt", t("%|if %c:\n%+%c%-", &[Child(0), Child(2)])),
        (
            "ifelsestmt",
            t("%|if %c:\n%+%c%-%|else:\n%+%c%-", &[Child(0), Child(2), Child(-2)]),
        ),
        ("ifelifstmt", t("%|if %c:\n%+%c%-%c", &[Child(0), Child(2), Child(-2)])),
        ("elifelifstmt", t("%|elif %c:\n%+%c%-%c", &[Child(0), Child(2), Child(-2)])),
        ("elifstmt", t("%|elif %c:\n%+%c%-", &[Child(0), Child(2)])),
        (
            "elifelsestmt",
            t("%|elif %c:\n%+%c%-%|else:\n%+%c%-", &[Child(0), Child(2), Child(-2)]),
        ),
        ("whilestmt", t("%|while %c:\n%+%c%-", &[Child(1), Child(4)])),
        (
            "whileelsestmt",
            t("%|while %c:\n%+%c%-%|else:\n%+%c%-", &[Child(1), Child(4), Child(9)]),
        ),
        ("forstmt", t("%|for %c in %c:\n%+%c%-", &[Child(4), Child(1), Child(5)])),
        (
            "forelsestmt",
            t(
                "%|for %c in %c:\n%+%c%-%|else:\n%+%c%-",
                &[Child(4), Child(1), Child(5), Child(9)],
            ),
        ),
        ("trystmt", t("%|try:\n%+%c%-%c", &[Child(1), Child(5)])),
        ("except", t("%|except:\n%+%c%-", &[Child(3)])),
        ("except_cond1", t("%|except %c:\n%+%c%-", &[Child(1), Child(8)])),
        (
            "except_cond2",
            t("%|except %c, %c:\n%+%c%-", &[Child(1), Child(6), Child(8)]),
        ),
        ("except_else", t("%|else:\n%+%c%-", &[Child(2)])),
        (
            "tryfinallystmt",
            t("%|try:\n%+%c%-%|finally:\n%+%c%-", &[Child(1), Child(5)]),
        ),
    ])
});
