//! Editing lowered IR the way a transformation pass would.

use teal_ir::error::StructuralError;
use teal_ir::ir::{BinOp, Builder, Function, Insn, Local, Operand, PrintOptions, ProgramBuilder};
use teal_ir::value::Value;
use teal_ir::{demos, lower};

fn copy(dst: Local, value: i64) -> Insn {
    Insn::Copy {
        dst,
        src: Operand::from(value),
    }
}

/// `f(n) { if n then return 1 else return 2 }`
fn two_way() -> Function {
    let mut func = Function::new("f", vec!["n".to_string()]);
    let n = func.param_local(0).unwrap();
    let mut b = Builder::new(&mut func);
    let then_bb = b.create_block("then");
    let else_bb = b.create_block("else");
    b.branch(n, then_bb, else_bb).unwrap();
    b.switch_to(then_bb);
    b.ret(1_i64).unwrap();
    b.switch_to(else_bb);
    b.ret(2_i64).unwrap();
    func
}

fn check_edge_symmetry(func: &Function) {
    for block in func.blocks() {
        for succ in block.successors() {
            assert!(
                func.predecessors(*succ).unwrap().contains(&block.id()),
                "{} -> {} is not mirrored",
                block.id(),
                succ
            );
        }
        for pred in block.predecessors() {
            assert!(func.successors(*pred).unwrap().contains(&block.id()));
        }
    }
}

#[test]
fn test_insert_at_front_twice() {
    let mut func = two_way();
    let entry = func.entry();
    let t = func.new_local();
    let first = func.new_insn(copy(t, 1));
    let second = func.new_insn(copy(t, 2));
    let before = func.count(entry).unwrap();

    func.insert_insn(entry, first, 0).unwrap();
    func.insert_insn(entry, second, 0).unwrap();

    assert_eq!(func.count(entry).unwrap(), before + 2);
    assert_eq!(func.at(entry, 0).unwrap(), second);
    assert_eq!(func.at(entry, 1).unwrap(), first);
    func.verify().unwrap();
}

#[test]
fn test_chained_before_and_after() {
    let mut func = two_way();
    let entry = func.entry();
    let branch = func.at(entry, 0).unwrap();
    let t = func.new_local();

    let a = func.new_insn(copy(t, 1));
    let b = func.new_insn(copy(t, 2));
    let c = func.new_insn(copy(t, 3));
    let a = func.insn_before(branch, a).unwrap();
    let c = func.insn_before(branch, c).unwrap();
    let b = func.insn_after(a, b).unwrap();

    assert_eq!(func.count(entry).unwrap(), 4);
    let order: Vec<_> = func.block_insns(entry).unwrap().map(|(id, _)| id).collect();
    assert_eq!(order, vec![a, b, c, branch]);
    assert_eq!(func.position(b).unwrap(), (entry, 1));
    func.verify().unwrap();
}

#[test]
fn test_insert_rejects_owned_and_out_of_range() {
    let mut func = two_way();
    let entry = func.entry();
    let branch = func.at(entry, 0).unwrap();
    let t = func.new_local();

    assert_eq!(
        func.insert_insn(entry, branch, 0),
        Err(StructuralError::AlreadyOwned {
            insn: branch,
            block: entry
        })
    );
    let detached = func.new_insn(copy(t, 0));
    assert_eq!(
        func.insert_insn(entry, detached, 5),
        Err(StructuralError::IndexOutOfRange {
            block: entry,
            index: 5,
            len: 1
        })
    );
    assert_eq!(
        func.insn_after(detached, detached),
        Err(StructuralError::Detached { insn: detached })
    );
    assert_eq!(func.count(entry).unwrap(), 1);
}

#[test]
fn test_remove_and_reinsert_elsewhere() {
    let mut func = two_way();
    let entry = func.entry();
    let then_bb = func.successors(entry).unwrap()[0];
    let else_bb = func.successors(entry).unwrap()[1];
    let t = func.new_local();

    let moved = func.new_insn(copy(t, 7));
    func.insert_insn(entry, moved, 0).unwrap();
    func.remove_insn(moved).unwrap();
    assert_eq!(func.owner(moved).unwrap(), None);
    assert_eq!(func.count(entry).unwrap(), 1);

    func.insert_insn(then_bb, moved, 0).unwrap();
    assert_eq!(func.owner(moved).unwrap(), Some(then_bb));
    assert_eq!(func.count(else_bb).unwrap(), 1);
    func.verify().unwrap();
}

#[test]
fn test_retarget_branch_keeps_edges_symmetric() {
    let mut func = two_way();
    let entry = func.entry();
    let then_bb = func.successors(entry).unwrap()[0];
    let else_bb = func.successors(entry).unwrap()[1];
    check_edge_symmetry(&func);

    // Send both arms of the branch to `then`.
    let branch = func.at(entry, 0).unwrap();
    let n = func.param_local(0).unwrap();
    func.replace_insn(
        branch,
        Insn::Branch {
            cond: n.into(),
            then_target: then_bb,
            else_target: then_bb,
        },
    )
    .unwrap();
    assert!(func.remove_edge(entry, else_bb).unwrap());
    assert!(!func.remove_edge(entry, else_bb).unwrap());
    assert!(!func.add_edge(entry, then_bb).unwrap());

    check_edge_symmetry(&func);
    assert!(func.predecessors(else_bb).unwrap().is_empty());
    assert_eq!(func.successors(entry).unwrap(), &[then_bb]);
    func.verify().unwrap();
}

#[test]
fn test_verify_catches_stale_edges() {
    let mut func = two_way();
    let entry = func.entry();
    let else_bb = func.successors(entry).unwrap()[1];
    func.remove_edge(entry, else_bb).unwrap();
    assert!(matches!(
        func.verify(),
        Err(StructuralError::Malformed { .. })
    ));
}

#[test]
fn test_rewrite_lowered_operator() {
    let program = demos::find("sum_rec").unwrap().program();
    let ir = lower::lower(&program, &lower::LowerOptions::default()).unwrap();
    let sum = ir.function_ref("main", "sum").unwrap();
    let mut func = ir.function(sum).unwrap().clone();

    let mut rewritten = 0;
    for block in 0..func.blocks().len() {
        let block = func.blocks()[block].id();
        let ids: Vec<_> = func.block_insns(block).unwrap().map(|(id, _)| id).collect();
        for id in ids {
            if let Insn::BinOp {
                dst,
                op: BinOp::Add,
                lhs,
                rhs,
            } = func.insn(id).unwrap().clone()
            {
                func.replace_insn(
                    id,
                    Insn::BinOp {
                        dst,
                        op: BinOp::Mul,
                        lhs,
                        rhs,
                    },
                )
                .unwrap();
                rewritten += 1;
            }
        }
    }
    assert_eq!(rewritten, 1);
    func.verify().unwrap();
    assert!(func.dump(Some(&ir), PrintOptions::default()).to_string().contains(" * "));
}

#[test]
fn test_edited_function_evaluates() {
    // main(n) = n + 1, then edited into (n + 1) * 2 before the return.
    let mut func = Function::new("main", vec!["n".to_string()]);
    let n = func.param_local(0).unwrap();
    let mut b = Builder::new(&mut func);
    let sum = b.binop(BinOp::Add, n, 1_i64).unwrap();
    b.ret(sum).unwrap();

    let entry = func.entry();
    let ret = func.at(entry, 1).unwrap();
    let doubled = func.new_local();
    let mul = func.new_insn(Insn::BinOp {
        dst: doubled,
        op: BinOp::Mul,
        lhs: sum.into(),
        rhs: 2_i64.into(),
    });
    func.insn_before(ret, mul).unwrap();
    func.replace_insn(ret, Insn::Return { value: doubled.into() }).unwrap();

    let mut pb = ProgramBuilder::new();
    let module = pb.add_module("main");
    let main = pb.declare_function(module, func).unwrap();
    let program = pb.finish(main).unwrap();

    let result = program.eval(vec![Value::Int(4)]).unwrap();
    assert_eq!(result.return_value(), &Value::Int(10));
}
