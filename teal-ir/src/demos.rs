//! Catalog of prebuilt validated programs.
//!
//! Each demo is the tree a front end would hand over for a small Teal
//! program. The binary can list, run and dump them, and the integration
//! tests use them as scenarios.

use anyhow::{Context, Result};

use crate::ast::{
    self, Expr, Stmt, assign, assign_global, binary, builtin, call, global, index, int, let_,
    local, ret, string,
};
use crate::builtins::names;
use crate::ir::{self, BinOp, SourceLocation};
use crate::lower::{LowerOptions, lower};

pub struct Demo {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameter names of the entry function.
    pub params: &'static [&'static str],
    build: fn() -> ast::Program,
}

impl Demo {
    pub fn program(&self) -> ast::Program {
        (self.build)()
    }

    pub fn lower(&self) -> Result<ir::Program> {
        lower(&self.program(), &LowerOptions::default())
            .with_context(|| format!("Failed to lower demo '{}'", self.name))
    }
}

static DEMOS: &[Demo] = &[
    Demo {
        name: "sum_rec",
        description: "recursive sum of 1..n",
        params: &["n"],
        build: sum_rec,
    },
    Demo {
        name: "sum_loop",
        description: "sum of 1..n with a while loop",
        params: &["n"],
        build: sum_loop,
    },
    Demo {
        name: "fact",
        description: "recursive factorial",
        params: &["n"],
        build: fact,
    },
    Demo {
        name: "array",
        description: "fill an array with 0..n, print its length and return its sum",
        params: &["n"],
        build: array,
    },
    Demo {
        name: "alias",
        description: "a callee writes to an array through a parameter and a global",
        params: &[],
        build: alias,
    },
    Demo {
        name: "index",
        description: "store to and load from slot i of a three-element array in a callee",
        params: &["i"],
        build: index_demo,
    },
    Demo {
        name: "diamond",
        description: "two modules importing the same base module",
        params: &["n"],
        build: diamond,
    },
    Demo {
        name: "global_init",
        description: "globals initialized from earlier globals",
        params: &[],
        build: global_init,
    },
    Demo {
        name: "unassigned_global",
        description: "read a global before anything assigns it",
        params: &[],
        build: unassigned_global,
    },
    Demo {
        name: "string_concat",
        description: "concatenate and print a greeting",
        params: &[],
        build: string_concat,
    },
    Demo {
        name: "invalid_plus",
        description: "add an int to a string, which fails at runtime",
        params: &[],
        build: invalid_plus,
    },
    Demo {
        name: "eq",
        description: "compare two values with ==",
        params: &["a", "b"],
        build: eq,
    },
    Demo {
        name: "read_echo",
        description: "read a line; double it if numeric, else print it back",
        params: &[],
        build: read_echo,
    },
];

pub fn all() -> &'static [Demo] {
    DEMOS
}

pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|demo| demo.name == name)
}

fn at(file: &str, line: u32, stmt: Stmt) -> Stmt {
    stmt.at(SourceLocation::new(file, line, 5, line, 40))
}

fn single(body: ast::Module) -> ast::Program {
    ast::Program::new("main").module("main", body)
}

fn sum_rec() -> ast::Program {
    let file = "sum_rec.teal";
    single(
        ast::Module::new()
            .function(
                "sum",
                &["n"],
                vec![
                    at(
                        file,
                        2,
                        Stmt::If {
                            cond: binary(BinOp::Leq, local("n"), int(0)),
                            then_body: vec![at(file, 3, ret(int(0)))],
                            else_body: vec![],
                        },
                    ),
                    at(
                        file,
                        5,
                        ret(binary(
                            BinOp::Add,
                            local("n"),
                            call("main", "sum", vec![binary(BinOp::Sub, local("n"), int(1))]),
                        )),
                    ),
                ],
            )
            .function(
                "main",
                &["n"],
                vec![at(file, 9, ret(call("main", "sum", vec![local("n")])))],
            ),
    )
}

fn sum_loop() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &["n"],
        vec![
            let_("acc", int(0)),
            let_("i", int(1)),
            Stmt::While {
                cond: binary(BinOp::Leq, local("i"), local("n")),
                body: vec![
                    assign("acc", binary(BinOp::Add, local("acc"), local("i"))),
                    assign("i", binary(BinOp::Add, local("i"), int(1))),
                ],
            },
            ret(local("acc")),
        ],
    ))
}

fn fact() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &["n"],
        vec![
            Stmt::If {
                cond: binary(BinOp::Eq, local("n"), int(0)),
                then_body: vec![ret(int(1))],
                else_body: vec![],
            },
            ret(binary(
                BinOp::Mul,
                local("n"),
                call("main", "main", vec![binary(BinOp::Sub, local("n"), int(1))]),
            )),
        ],
    ))
}

fn array() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &["n"],
        vec![
            let_("a", Expr::NewArray(Box::new(local("n")))),
            let_("i", int(0)),
            Stmt::While {
                cond: binary(BinOp::Lt, local("i"), local("n")),
                body: vec![
                    Stmt::AssignIndex {
                        array: local("a"),
                        index: local("i"),
                        value: local("i"),
                    },
                    assign("i", binary(BinOp::Add, local("i"), int(1))),
                ],
            },
            Stmt::Expr(builtin(
                names::PRINT,
                vec![builtin(names::ARRAY_LENGTH, vec![local("a")])],
            )),
            let_("sum", int(0)),
            assign("i", int(0)),
            Stmt::While {
                cond: binary(
                    BinOp::Lt,
                    local("i"),
                    builtin(names::ARRAY_LENGTH, vec![local("a")]),
                ),
                body: vec![
                    assign(
                        "sum",
                        binary(BinOp::Add, local("sum"), index(local("a"), local("i"))),
                    ),
                    assign("i", binary(BinOp::Add, local("i"), int(1))),
                ],
            },
            ret(local("sum")),
        ],
    ))
}

fn alias() -> ast::Program {
    single(
        ast::Module::new()
            .global("shared", None)
            .function(
                "fill",
                &["xs"],
                vec![
                    Stmt::AssignIndex {
                        array: local("xs"),
                        index: int(0),
                        value: int(4),
                    },
                    Stmt::AssignIndex {
                        array: global("main", "shared"),
                        index: int(1),
                        value: int(5),
                    },
                    ret(int(0)),
                ],
            )
            .function(
                "main",
                &[],
                vec![
                    let_("a", Expr::NewArray(Box::new(int(2)))),
                    assign_global("main", "shared", local("a")),
                    Stmt::Expr(call("main", "fill", vec![local("a")])),
                    ret(binary(
                        BinOp::Add,
                        index(local("a"), int(0)),
                        index(local("a"), int(1)),
                    )),
                ],
            ),
    )
}

fn index_demo() -> ast::Program {
    single(
        ast::Module::new()
            .function(
                "poke",
                &["xs", "i"],
                vec![
                    Stmt::AssignIndex {
                        array: local("xs"),
                        index: local("i"),
                        value: int(7),
                    },
                    ret(index(local("xs"), local("i"))),
                ],
            )
            .function(
                "main",
                &["i"],
                vec![
                    let_("a", Expr::NewArray(Box::new(int(3)))),
                    let_("v", call("main", "poke", vec![local("a"), local("i")])),
                    Stmt::Expr(builtin(names::PRINT, vec![local("a")])),
                    ret(local("v")),
                ],
            ),
    )
}

fn diamond() -> ast::Program {
    // Both sides bump the same counter in `base`.
    let pass = |side: &str| {
        ast::Module::new().import("base").function(
            "pass",
            &["x"],
            vec![
                assign_global(
                    "base",
                    "calls",
                    binary(BinOp::Add, global("base", "calls"), int(1)),
                ),
                Stmt::Expr(builtin(names::PRINT, vec![string(side)])),
                ret(call("base", "ident", vec![local("x")])),
            ],
        )
    };
    ast::Program::new("main")
        .module(
            "main",
            ast::Module::new()
                .import("left")
                .import("right")
                .function(
                    "main",
                    &["n"],
                    vec![ret(binary(
                        BinOp::Add,
                        call("left", "pass", vec![local("n")]),
                        call("right", "pass", vec![local("n")]),
                    ))],
                ),
        )
        .module("left", pass("left"))
        .module("right", pass("right"))
        .module(
            "base",
            ast::Module::new()
                .global("calls", Some(int(0)))
                .global(
                    "banner",
                    Some(builtin(names::PRINT, vec![string("base initialized")])),
                )
                .function("ident", &["x"], vec![ret(local("x"))]),
        )
}

fn global_init() -> ast::Program {
    single(
        ast::Module::new()
            .global("a", Some(int(1)))
            .global("b", Some(binary(BinOp::Add, global("main", "a"), int(2))))
            .global("c", Some(binary(BinOp::Mul, global("main", "b"), int(2))))
            .function("main", &[], vec![ret(global("main", "c"))]),
    )
}

fn unassigned_global() -> ast::Program {
    single(
        ast::Module::new()
            .global("g", None)
            .function(
                "main",
                &[],
                vec![
                    let_("before", global("main", "g")),
                    assign_global("main", "g", int(5)),
                    ret(local("before")),
                ],
            ),
    )
}

fn string_concat() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &[],
        vec![
            let_(
                "s",
                binary(
                    BinOp::Concat,
                    binary(BinOp::Concat, string("Hello"), string(" ")),
                    string("World"),
                ),
            ),
            Stmt::Expr(builtin(names::PRINT, vec![local("s")])),
            ret(local("s")),
        ],
    ))
}

fn invalid_plus() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &[],
        vec![ret(binary(BinOp::Add, int(1), string("one")))],
    ))
}

fn eq() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &["a", "b"],
        vec![ret(binary(BinOp::Eq, local("a"), local("b")))],
    ))
}

fn read_echo() -> ast::Program {
    single(ast::Module::new().function(
        "main",
        &[],
        vec![
            let_("line", builtin(names::READ, vec![])),
            Stmt::If {
                cond: builtin(names::CAN_CONVERT_TO_INT, vec![local("line")]),
                then_body: vec![ret(binary(
                    BinOp::Mul,
                    builtin(names::STRING_TO_INT, vec![local("line")]),
                    int(2),
                ))],
                else_body: vec![Stmt::Expr(builtin(names::PRINT, vec![local("line")]))],
            },
            ret(local("line")),
        ],
    ))
}
