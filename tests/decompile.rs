//! End-to-end decompilation of hand-assembled code objects.
//!
//! Each program is assembled the way the 2.0 compiler lays it out and must
//! come back as the source it was compiled from.

use pyrecover::bytecode::assemble::CodeBuilder;
use pyrecover::bytecode::{CodeObject, DecodeError, Opcode};
use pyrecover::config::{Config, OutputConfig};
use pyrecover::lang::value::Constant;
use pyrecover::{Decompiler, Error, decompile};
use rstest::rstest;

fn module(build: impl FnOnce(&mut CodeBuilder)) -> CodeObject {
    let mut b = CodeBuilder::module();
    build(&mut b);
    b.return_none();
    b.finish().unwrap()
}

fn int(n: i64) -> Constant {
    Constant::Int(n)
}

fn assign_int(b: &mut CodeBuilder, name: &str, n: i64) {
    b.load_const(int(n)).store_name(name);
}

/// `if <cond>: <name> = <n>` up to the jump past the else branch.
fn if_branch(b: &mut CodeBuilder, cond: &str, name: &str, n: i64) -> pyrecover::bytecode::assemble::Label {
    let next = b.label();
    b.load_name(cond).jump(Opcode::JumpIfFalse, next).op(Opcode::PopTop);
    assign_int(b, name, n);
    next
}

mod programs {
    use super::*;

    pub fn assignment() -> CodeObject {
        module(|b| {
            b.load_name("a")
                .load_const(int(1))
                .op(Opcode::BinaryAdd)
                .store_name("b");
        })
    }

    pub fn if_else() -> CodeObject {
        module(|b| {
            let end = b.label();
            let next = if_branch(b, "x", "y", 1);
            b.jump(Opcode::JumpForward, end);
            b.bind(next).op(Opcode::PopTop);
            assign_int(b, "y", 2);
            b.bind(end);
        })
    }

    pub fn if_only() -> CodeObject {
        module(|b| {
            let end = b.label();
            let next = if_branch(b, "x", "y", 1);
            b.jump(Opcode::JumpForward, end);
            b.bind(next).op(Opcode::PopTop);
            b.bind(end);
        })
    }

    pub fn elif_ladder() -> CodeObject {
        module(|b| {
            let end = b.label();
            for (cond, n) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
                let next = if_branch(b, cond, "x", n);
                b.jump(Opcode::JumpForward, end);
                b.bind(next).op(Opcode::PopTop);
            }
            assign_int(b, "x", 5);
            b.bind(end);
        })
    }

    pub fn elif_without_else() -> CodeObject {
        module(|b| {
            let end = b.label();
            let next = if_branch(b, "a", "x", 1);
            b.jump(Opcode::JumpForward, end);
            b.bind(next).op(Opcode::PopTop);
            let inner = if_branch(b, "b", "x", 2);
            b.jump(Opcode::JumpForward, end);
            b.bind(inner).op(Opcode::PopTop);
            b.bind(end);
        })
    }

    pub fn while_loop() -> CodeObject {
        module(|b| {
            let (end, top, out) = (b.label(), b.label(), b.label());
            b.jump(Opcode::SetupLoop, end);
            b.bind(top)
                .load_name("x")
                .jump(Opcode::JumpIfFalse, out)
                .op(Opcode::PopTop);
            assign_int(b, "y", 1);
            b.jump(Opcode::JumpAbsolute, top);
            b.bind(out).op(Opcode::PopTop).op(Opcode::PopBlock);
            b.bind(end);
        })
    }

    pub fn for_loop() -> CodeObject {
        module(|b| {
            let (end, top, out) = (b.label(), b.label(), b.label());
            b.jump(Opcode::SetupLoop, end);
            b.load_name("xs").load_const(int(0));
            b.bind(top).jump(Opcode::ForLoop, out).store_name("i");
            b.load_name("i").op(Opcode::PrintItem).op(Opcode::PrintNewline);
            b.jump(Opcode::JumpAbsolute, top);
            b.bind(out).op(Opcode::PopBlock);
            b.bind(end);
        })
    }

    pub fn try_except() -> CodeObject {
        module(|b| {
            let (handler, next, end) = (b.label(), b.label(), b.label());
            b.jump(Opcode::SetupExcept, handler);
            assign_int(b, "x", 1);
            b.op(Opcode::PopBlock).jump(Opcode::JumpForward, end);

            b.bind(handler)
                .op(Opcode::DupTop)
                .load_name("E")
                .compare("exception match")
                .jump(Opcode::JumpIfFalse, next);
            for _ in 0..4 {
                b.op(Opcode::PopTop);
            }
            assign_int(b, "y", 2);
            b.jump(Opcode::JumpForward, end);

            b.bind(next).op(Opcode::PopTop).op(Opcode::EndFinally);
            b.bind(end);
        })
    }

    pub fn try_except_bound() -> CodeObject {
        module(|b| {
            let (handler, next, end) = (b.label(), b.label(), b.label());
            b.jump(Opcode::SetupExcept, handler);
            assign_int(b, "x", 1);
            b.op(Opcode::PopBlock).jump(Opcode::JumpForward, end);

            b.bind(handler)
                .op(Opcode::DupTop)
                .load_name("E")
                .compare("exception match")
                .jump(Opcode::JumpIfFalse, next);
            b.op(Opcode::PopTop).op(Opcode::PopTop).store_name("e").op(Opcode::PopTop);
            b.load_name("e").op(Opcode::PrintItem).op(Opcode::PrintNewline);
            b.jump(Opcode::JumpForward, end);

            b.bind(next).op(Opcode::PopTop).op(Opcode::EndFinally);
            b.bind(end);
        })
    }

    pub fn try_finally() -> CodeObject {
        module(|b| {
            let handler = b.label();
            b.jump(Opcode::SetupFinally, handler);
            assign_int(b, "x", 1);
            b.op(Opcode::PopBlock).load_const(Constant::None);
            b.bind(handler);
            assign_int(b, "y", 2);
            b.op(Opcode::EndFinally);
        })
    }

    pub fn while_else() -> CodeObject {
        module(|b| {
            let (end, top, out) = (b.label(), b.label(), b.label());
            b.jump(Opcode::SetupLoop, end);
            b.bind(top)
                .load_name("x")
                .jump(Opcode::JumpIfFalse, out)
                .op(Opcode::PopTop);
            b.op(Opcode::BreakLoop).jump(Opcode::JumpAbsolute, top);
            b.bind(out).op(Opcode::PopTop).op(Opcode::PopBlock);
            assign_int(b, "y", 1);
            b.bind(end);
        })
    }

    pub fn for_else() -> CodeObject {
        module(|b| {
            let (end, top, out) = (b.label(), b.label(), b.label());
            b.jump(Opcode::SetupLoop, end);
            b.load_name("xs").load_const(int(0));
            b.bind(top).jump(Opcode::ForLoop, out).store_name("i");
            b.load_name("i").op(Opcode::PrintItem).op(Opcode::PrintNewline);
            b.jump(Opcode::JumpAbsolute, top);
            b.bind(out).op(Opcode::PopBlock);
            assign_int(b, "y", 1);
            b.bind(end);
        })
    }

    /// `for i in xs: if i: continue`
    pub fn for_continue() -> CodeObject {
        module(|b| {
            let (end, top, out, skip, done) = (b.label(), b.label(), b.label(), b.label(), b.label());
            b.jump(Opcode::SetupLoop, end);
            b.load_name("xs").load_const(int(0));
            b.bind(top).jump(Opcode::ForLoop, out).store_name("i");
            b.load_name("i").jump(Opcode::JumpIfFalse, skip).op(Opcode::PopTop);
            b.jump(Opcode::JumpAbsolute, top).jump(Opcode::JumpForward, done);
            b.bind(skip).op(Opcode::PopTop);
            b.bind(done).jump(Opcode::JumpAbsolute, top);
            b.bind(out).op(Opcode::PopBlock);
            b.bind(end);
        })
    }

    pub fn aug_assign() -> CodeObject {
        module(|b| {
            b.load_name("x")
                .load_const(int(1))
                .op(Opcode::InplaceAdd)
                .store_name("x");
        })
    }

    /// `y = a and b` or `y = a or b`, depending on the jump.
    pub fn boolean(jump: Opcode) -> CodeObject {
        module(|b| {
            let end = b.label();
            b.load_name("a").jump(jump, end).op(Opcode::PopTop).load_name("b");
            b.bind(end).store_name("y");
        })
    }

    pub fn chained_compare() -> CodeObject {
        module(|b| {
            let (cleanup, end) = (b.label(), b.label());
            b.load_name("a")
                .load_name("b")
                .op(Opcode::DupTop)
                .op(Opcode::RotThree)
                .compare("<")
                .jump(Opcode::JumpIfFalse, cleanup)
                .op(Opcode::PopTop);
            b.load_name("c").compare("<").jump(Opcode::JumpForward, end);
            b.bind(cleanup).op(Opcode::RotTwo).op(Opcode::PopTop);
            b.bind(end).store_name("y");
        })
    }

    pub fn assert_stmt() -> CodeObject {
        module(|b| {
            let end = b.label();
            b.load_name("__debug__").jump(Opcode::JumpIfFalse, end).op(Opcode::PopTop);
            b.load_name("x").jump(Opcode::JumpIfTrue, end).op(Opcode::PopTop);
            b.load_global("AssertionError").op_arg(Opcode::RaiseVarargs, 1);
            b.bind(end).op(Opcode::PopTop);
        })
    }

    pub fn raise_with_value() -> CodeObject {
        module(|b| {
            b.load_name("E").load_name("v").op_arg(Opcode::RaiseVarargs, 2);
        })
    }

    pub fn delete() -> CodeObject {
        module(|b| {
            b.name_op(Opcode::DeleteName, "x");
        })
    }

    pub fn print_to() -> CodeObject {
        module(|b| {
            b.load_name("f")
                .op(Opcode::DupTop)
                .load_name("x")
                .op(Opcode::RotTwo)
                .op(Opcode::PrintItemTo)
                .op(Opcode::PrintNewlineTo);
        })
    }

    pub fn slice() -> CodeObject {
        module(|b| {
            b.load_name("s")
                .load_name("i")
                .load_name("j")
                .op(Opcode::Slice3)
                .store_name("t");
        })
    }

    pub fn negative_int() -> CodeObject {
        module(|b| assign_int(b, "y", -1))
    }

    pub fn imports() -> CodeObject {
        module(|b| {
            b.load_const(Constant::None)
                .name_op(Opcode::ImportName, "os")
                .store_name("os");
            b.load_const(Constant::Tuple(vec![
                Constant::Str("path".into()),
                Constant::Str("sep".into()),
            ]))
            .name_op(Opcode::ImportName, "os")
            .name_op(Opcode::ImportFrom, "path")
            .store_name("path")
            .name_op(Opcode::ImportFrom, "sep")
            .store_name("s")
            .op(Opcode::PopTop);
            b.load_const(Constant::Tuple(vec![Constant::Str("*".into())]))
                .name_op(Opcode::ImportName, "string")
                .op(Opcode::ImportStar);
        })
    }

    pub fn list_comprehension() -> CodeObject {
        module(|b| {
            let (top, out) = (b.label(), b.label());
            b.op_arg(Opcode::BuildList, 0)
                .op(Opcode::DupTop)
                .load_attr("append")
                .store_name("_[1]");
            b.load_name("xs").load_const(int(0));
            b.bind(top).jump(Opcode::ForLoop, out).store_name("i");
            b.load_name("_[1]")
                .load_name("i")
                .load_name("i")
                .op(Opcode::BinaryMultiply)
                .op_arg(Opcode::CallFunction, 1)
                .op(Opcode::PopTop)
                .jump(Opcode::JumpAbsolute, top);
            b.bind(out).name_op(Opcode::DeleteName, "_[1]").store_name("squares");
        })
    }

    pub fn dict_display() -> CodeObject {
        module(|b| {
            b.op_arg(Opcode::BuildMap, 0);
            b.op(Opcode::DupTop)
                .load_const(int(1))
                .op(Opcode::RotTwo)
                .load_const(Constant::Str("a".into()))
                .op(Opcode::StoreSubscr);
            b.store_name("d");
        })
    }

    pub fn calls() -> CodeObject {
        module(|b| {
            b.load_name("f")
                .load_name("a")
                .load_const(Constant::Str("k".into()))
                .load_name("v")
                .load_name("rest")
                .op_arg(Opcode::CallFunctionVar, 0x0101)
                .op(Opcode::PopTop);
        })
    }

    pub fn function(doc: Option<&str>) -> CodeObject {
        let mut body = CodeBuilder::function("f", &["a", "b"], doc);
        body.load_fast("a").load_fast("b").op(Opcode::BinaryAdd).op(Opcode::ReturnValue);
        body.return_none();
        let body = body.finish().unwrap();

        module(|b| {
            b.load_const(int(1))
                .load_code(body)
                .op_arg(Opcode::MakeFunction, 1)
                .store_name("f");
        })
    }

    pub fn empty_function() -> CodeObject {
        let mut body = CodeBuilder::function("g", &[], None);
        body.return_none();
        let body = body.finish().unwrap();

        module(|b| {
            b.load_code(body)
                .op_arg(Opcode::MakeFunction, 0)
                .store_name("g");
        })
    }

    pub fn star_params() -> CodeObject {
        let mut body = CodeBuilder::function("h", &["x"], None);
        body.varargs("args").varkeywords("kw");
        body.return_none();
        let body = body.finish().unwrap();

        module(|b| {
            b.load_const(Constant::None)
                .load_code(body)
                .op_arg(Opcode::MakeFunction, 1)
                .store_name("h");
        })
    }

    pub fn tuple_param() -> CodeObject {
        let mut body = CodeBuilder::function("f", &["a", ".1"], None);
        body.load_fast(".1")
            .op_arg(Opcode::UnpackSequence, 2)
            .store_fast("b")
            .store_fast("c");
        body.load_fast("c").op(Opcode::ReturnValue);
        body.return_none();
        let body = body.finish().unwrap();

        module(|b| {
            b.load_code(body)
                .op_arg(Opcode::MakeFunction, 0)
                .store_name("f");
        })
    }

    pub fn lambda() -> CodeObject {
        let mut body = CodeBuilder::function("<lambda>", &["x"], None);
        body.load_fast("x")
            .load_const(int(1))
            .op(Opcode::BinaryAdd)
            .op(Opcode::ReturnValue);
        let body = body.finish().unwrap();

        module(|b| {
            b.load_code(body)
                .op_arg(Opcode::MakeFunction, 0)
                .store_name("inc");
        })
    }

    pub fn class(doc: Option<&str>, base: Option<&str>) -> CodeObject {
        let mut body = CodeBuilder::class("A", doc);
        body.load_const(int(1)).store_name("x");
        body.op(Opcode::LoadLocals).op(Opcode::ReturnValue);
        let body = body.finish().unwrap();

        module(|b| {
            b.load_const(Constant::Str("A".into()));
            match base {
                Some(base) => b.load_name(base).op_arg(Opcode::BuildTuple, 1),
                None => b.op_arg(Opcode::BuildTuple, 0),
            };
            b.load_code(body)
                .op_arg(Opcode::MakeFunction, 0)
                .op_arg(Opcode::CallFunction, 0)
                .op(Opcode::BuildClass)
                .store_name("A");
        })
    }

    pub fn global_store() -> CodeObject {
        let mut body = CodeBuilder::function("set", &[], None);
        body.load_const(int(1)).name_op(Opcode::StoreGlobal, "counter");
        body.load_const(int(2)).name_op(Opcode::StoreGlobal, "counter");
        body.return_none();
        let body = body.finish().unwrap();

        module(|b| {
            b.load_code(body)
                .op_arg(Opcode::MakeFunction, 0)
                .store_name("set");
        })
    }

    pub fn module_doc() -> CodeObject {
        module(|b| {
            b.load_const(Constant::Str("Module doc.".into()))
                .store_name("__doc__");
            assign_int(b, "x", 1);
        })
    }
}

#[rstest]
#[case::assignment(programs::assignment(), "b = a + 1\n")]
#[case::if_else(programs::if_else(), "if x:\n    y = 1\nelse:\n    y = 2\n")]
#[case::if_only(programs::if_only(), "if x:\n    y = 1\n")]
#[case::elif_ladder(
    programs::elif_ladder(),
    "if a:\n    x = 1\nelif b:\n    x = 2\nelif c:\n    x = 3\nelif d:\n    x = 4\nelse:\n    x = 5\n"
)]
#[case::elif_without_else(programs::elif_without_else(), "if a:\n    x = 1\nelif b:\n    x = 2\n")]
#[case::while_loop(programs::while_loop(), "while x:\n    y = 1\n")]
#[case::for_loop(programs::for_loop(), "for i in xs:\n    print i\n")]
#[case::try_except(programs::try_except(), "try:\n    x = 1\nexcept E:\n    y = 2\n")]
#[case::except_binds_name(
    programs::try_except_bound(),
    "try:\n    x = 1\nexcept E, e:\n    print e\n"
)]
#[case::try_finally(programs::try_finally(), "try:\n    x = 1\nfinally:\n    y = 2\n")]
#[case::while_else(programs::while_else(), "while x:\n    break\nelse:\n    y = 1\n")]
#[case::for_else(programs::for_else(), "for i in xs:\n    print i\nelse:\n    y = 1\n")]
#[case::continue_in_loop(programs::for_continue(), "for i in xs:\n    if i:\n        continue\n")]
#[case::aug_assign(programs::aug_assign(), "x += 1\n")]
#[case::and(programs::boolean(Opcode::JumpIfFalse), "y = a and b\n")]
#[case::or(programs::boolean(Opcode::JumpIfTrue), "y = a or b\n")]
#[case::chained_compare(programs::chained_compare(), "y = a < b < c\n")]
#[case::assert(programs::assert_stmt(), "assert x\n")]
#[case::raise_with_value(programs::raise_with_value(), "raise E, v\n")]
#[case::delete(programs::delete(), "del x\n")]
#[case::print_to(programs::print_to(), "print >> f, x\n")]
#[case::slice(programs::slice(), "t = s[i:j]\n")]
#[case::negative_int_is_hex(programs::negative_int(), "y = 0xffffffff\n")]
#[case::imports(
    programs::imports(),
    "import os\nfrom os import path, sep as s\nfrom string import *\n"
)]
#[case::list_comprehension(programs::list_comprehension(), "squares = [i * i for i in xs]\n")]
#[case::dict_display(programs::dict_display(), "d = {'a': 1}\n")]
#[case::calls(programs::calls(), "f(a, k=v, *rest)\n")]
#[case::function_with_default(programs::function(None), "def f(a, b=1):\n    return a + b\n")]
#[case::function_docstring(
    programs::function(Some("Add.")),
    "def f(a, b=1):\n    'Add.'\n    return a + b\n"
)]
#[case::empty_function(programs::empty_function(), "def g():\n    pass\n")]
#[case::star_params(programs::star_params(), "def h(x=None, *args, **kw):\n    pass\n")]
#[case::tuple_param(programs::tuple_param(), "def f(a, (b, c)):\n    return c\n")]
#[case::lambda(programs::lambda(), "inc = lambda x: x + 1\n")]
#[case::class(programs::class(None, None), "class A:\n    x = 1\n")]
#[case::class_with_base(
    programs::class(Some("A class."), Some("Base")),
    "class A(Base):\n    'A class.'\n    x = 1\n"
)]
#[case::globals(
    programs::global_store(),
    "def set():\n    global counter\n    counter = 1\n    counter = 2\n"
)]
#[case::module_doc(programs::module_doc(), "'Module doc.'\nx = 1\n")]
fn test_decompiles_to_source(#[case] code: CodeObject, #[case] expected: &str) {
    assert_eq!(decompile(&code).unwrap(), expected);
}

#[test]
fn test_empty_module_is_empty_text() {
    assert_eq!(decompile(&module(|_| {})).unwrap(), "");
}

#[test]
fn test_configured_indent() {
    let config = Config {
        output: OutputConfig {
            indent: "\t".to_string(),
        },
        ..Config::default()
    };
    let text = Decompiler::new(config).decompile(&programs::if_else()).unwrap();
    assert_eq!(text, "if x:\n\ty = 1\nelse:\n\ty = 2\n");
}

#[test]
fn test_repeated_runs_agree() {
    let code = programs::elif_ladder();
    let decompiler = Decompiler::default();
    let first = decompiler.decompile(&code).unwrap();
    assert_eq!(decompiler.decompile(&code).unwrap(), first);
    assert_eq!(
        decompiler.syntax_tree(&code).unwrap(),
        decompiler.syntax_tree(&code).unwrap()
    );
}

#[test]
fn test_shared_across_threads() {
    let decompiler = Decompiler::default();
    let programs = [
        programs::for_loop(),
        programs::try_except(),
        programs::class(None, Some("Base")),
        programs::list_comprehension(),
    ];
    let expected: Vec<String> = programs
        .iter()
        .map(|code| decompiler.decompile(code).unwrap())
        .collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = programs
            .iter()
            .map(|code| s.spawn(|| decompiler.decompile(code).unwrap()))
            .collect();
        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_function_text_with_defaults() {
    let mut body = CodeBuilder::function("f", &["a", "b"], None);
    body.return_none();
    let code = body.finish().unwrap();

    let text = Decompiler::default()
        .function_text(&code, &["".to_string()], 2)
        .unwrap();
    assert_eq!(text.signature, "a, b=None");
    assert_eq!(text.body, "        pass\n");
}

#[test]
fn test_truncated_instruction_is_a_decode_error() {
    let mut code = CodeObject::new("<module>");
    code.code = vec![100, 0];
    code.consts.push(Constant::None);
    assert!(matches!(
        decompile(&code),
        Err(Error::Decode(DecodeError::Truncated { offset: 0 }))
    ));
}

#[test]
fn test_unparsable_body_reports_its_scope() {
    let mut body = CodeBuilder::function("broken", &[], None);
    body.op(Opcode::BinaryAdd);
    body.return_none();
    let body = body.finish().unwrap();

    let code = module(|b| {
        b.load_code(body)
            .op_arg(Opcode::MakeFunction, 0)
            .store_name("broken");
    });

    let err = decompile(&code).unwrap_err();
    assert!(matches!(&err, Error::Scope { name, .. } if name == "broken"));
    let Error::Parse(parse) = err.root() else {
        panic!("expected a parse error, got {err}");
    };
    assert_eq!(parse.token.as_ref().map(|t| t.kind.as_str()), Some("BINARY_ADD"));
    assert!(parse.listing().contains("BINARY_ADD"));
}

#[test]
fn test_missing_star_slot() {
    let mut body = CodeBuilder::function("f", &[], None);
    body.return_none();
    let mut body = body.finish().unwrap();
    body.flags |= pyrecover::bytecode::ir::CO_VARARGS;

    let err = Decompiler::default().function_text(&body, &[], 1).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::MissingVarname { param: "*args", .. })
    ));
}

#[test]
fn test_depth_limit() {
    let mut config = Config::default();
    config.limits.max_depth = 2;
    let err = Decompiler::new(config)
        .decompile(&programs::assignment())
        .unwrap_err();
    assert!(matches!(err, Error::DepthExceeded { limit: 2 }));
}

/// `y = a.b.b...b` with `attrs` attribute loads, one tree level each.
fn attribute_chain(attrs: usize) -> CodeObject {
    module(|b| {
        b.load_name("a");
        for _ in 0..attrs {
            b.load_attr("b");
        }
        b.store_name("y");
    })
}

#[rstest]
#[case::within_limit(80)]
#[case::past_limit(400)]
fn test_default_depth_limit_fits_small_stack(#[case] attrs: usize) {
    let code = attribute_chain(attrs);
    let limit = Config::default().limits.max_depth;

    std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || {
            let result = decompile(&code);
            if attrs < limit {
                assert_eq!(result.unwrap(), format!("y = a{}\n", ".b".repeat(attrs)));
            } else {
                assert!(matches!(result, Err(Error::DepthExceeded { limit: l }) if l == limit));
            }
        })
        .unwrap()
        .join()
        .unwrap();
}
