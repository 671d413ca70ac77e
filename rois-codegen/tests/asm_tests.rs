//! End-to-end tests: build IR, emit assembly, execute it in the simulator

mod common;

use common::sim::{Exit, Machine};
use pretty_assertions::assert_eq;
use rois_codegen::{emit_module, AsmInst, AsmProgram, CodegenError, GpReg, LinearScanAllocator, AsmEmitter};
use rois_ir::{FuncType, Function, IrBuilder, Module, Type, Value};
use rois_opt::PassManager;

fn compile(module: &Module) -> AsmProgram {
    module.verify().unwrap();
    emit_module(module).unwrap()
}

fn module_of(functions: Vec<Function>) -> Module {
    let mut module = Module::new("test");
    for function in functions {
        module.add_function(function);
    }
    module
}

fn run(program: &AsmProgram, entry: &str, args: &[i32]) -> i32 {
    Machine::new(program).call(entry, args).int()
}

#[test]
fn test_sum_twice_returns_14() {
    let mut module = module_of(vec![programs::sum_twice()]);
    PassManager::new().run(&mut module).unwrap();
    let program = compile(&module);
    assert_eq!(run(&program, "f", &[3, 4]), 14);
    assert_eq!(run(&program, "f", &[-10, 2]), -16);
    assert_eq!(run(&program, "f", &[i32::MAX, 1]), 0);
}

#[test]
fn test_sum_twice_text() {
    let program = compile(&module_of(vec![programs::sum_twice()]));
    let text = program.to_string();
    assert!(text.contains(
        "f_bb0:\n; %0.2 = IAdd %0.0, %0.1\n\tmov r8d, ecx\n\tadd r8d, edx\n; %0.3 = IAdd %0.1, %0.0\n\tadd ecx, edx\n"
    ), "{text}");
}

#[test]
fn test_branch_join() {
    let program = compile(&module_of(vec![programs::max()]));
    for (a, b) in [(1, 2), (2, 1), (-5, -7), (3, 3)] {
        assert_eq!(run(&program, "max", &[a, b]), a.max(b), "max({a}, {b})");
    }
}

#[test]
fn test_loop_rotates_block_arguments() {
    let program = compile(&module_of(vec![programs::fib()]));
    let expected = [0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55];
    for (n, fib) in expected.iter().enumerate() {
        assert_eq!(run(&program, "fib", &[n as i32]), *fib, "fib({n})");
    }
    // (n-1, b, a+b) into (rcx, rdx, r8) needs one swap
    assert!(program.lines.iter().any(|l| matches!(
        l,
        AsmInst::Xchg(GpReg::Rdx, GpReg::R8) | AsmInst::Xchg(GpReg::R8, GpReg::Rdx)
    )));
}

#[test]
fn test_call_preserves_live_registers() {
    let square = programs::square();
    let caller = programs::square_plus(&square);
    let program = compile(&module_of(vec![caller, square]));
    assert_eq!(run(&program, "square_plus", &[3, 4]), 13);

    let start = program.label_index("square_plus_bb0").unwrap();
    let body: Vec<String> = program.lines[start..]
        .iter()
        .filter(|l| !matches!(l, AsmInst::Comment(_)))
        .take(8)
        .map(|l| l.to_string())
        .collect();
    // one push plus the return address already keep rsp aligned
    assert_eq!(body, vec![
        "square_plus_bb0:",
        "\tpush rdx",
        "\tsub rsp, 32",
        "\tcall square",
        "\tadd rsp, 32",
        "\tmov rcx, rax",
        "\tpop rdx",
        "\tadd ecx, edx",
    ]);
}

#[test]
fn test_foreign_call_clobbers_only_unsaved() {
    let print = programs::print_int();
    let program = compile(&module_of(vec![programs::log_sum(&print), print]));
    let mut machine = Machine::new(&program);
    assert_eq!(machine.call("log_sum", &[3, 4]).int(), 7);
    assert_eq!(machine.foreign_calls, vec![("print_int".to_string(), vec![3, 4, 0, 0])]);
}

#[test]
fn test_foreign_call_frame_keeps_pushed_registers() {
    // the callee owns the 32 bytes above rsp, so the saved rcx and rdx
    // have to sit below a reserved home area
    let print = programs::print_int();
    let program = compile(&module_of(vec![programs::log_sum(&print), print]));
    assert!(program.to_string().contains(
        "\tpush rcx\n\tpush rdx\n\tsub rsp, 40\n\tcall print_int\n\tadd rsp, 40\n\tpop rdx\n\tpop rcx\n"
    ), "{program}");
    for (a, b) in [(3, 4), (-1, 1), (100, -7)] {
        assert_eq!(run(&program, "log_sum", &[a, b]), a + b);
    }
}

#[test]
fn test_bool_bitcast_keeps_raw_bits() {
    // Not(Bitcast(x) And true): only the low bit of x takes part
    let mut f = Function::new("low_bit_clear", FuncType::new(vec![Type::Int], Type::Int));
    let mut b = IrBuilder::new(&mut f);
    let x = b.block_arg(0).unwrap();
    let flag = b.build_bitcast(x, Type::Bool).unwrap();
    let both = b.build_and(flag, Value::ConstBool(true)).unwrap();
    let inverted = b.build_not(both).unwrap();
    let back = b.build_bitcast(inverted, Type::Int).unwrap();
    b.build_ret(back).unwrap();

    let program = compile(&module_of(vec![f]));
    assert_eq!(run(&program, "low_bit_clear", &[2]), 1);
    assert_eq!(run(&program, "low_bit_clear", &[3]), 0);
    assert_eq!(run(&program, "low_bit_clear", &[6]), 1);
}

#[test]
fn test_indirect_call() {
    let square = programs::square();
    let apply = programs::apply();
    let main = programs::main_apply(&apply, &square);
    let program = compile(&module_of(vec![main, apply, square]));
    assert_eq!(run(&program, "main", &[]), 25);
    assert!(program.lines.contains(&AsmInst::Lea(GpReg::Rcx, "square".to_string())));
    assert!(program.lines.contains(&AsmInst::CallReg(GpReg::Rax)));
}

#[test]
fn test_objects_on_the_heap() {
    let mut module = module_of(vec![programs::point_sum(), programs::rect_area()]);
    module.add_class(programs::point_class());
    module.add_class(programs::shape_class());
    let program = compile(&module);
    assert_eq!(run(&program, "point_sum", &[3, 4]), 7);
    assert_eq!(run(&program, "rect_area", &[6, 7]), 42);
    assert!(program.to_string().contains("\tmov rcx, qword 12\n\tcall _halloc\n"));
}

#[test]
fn test_runtime_failure() {
    let program = compile(&module_of(vec![programs::always_fail()]));
    let exit = Machine::new(&program).call("always_fail", &[]);
    assert_eq!(exit, Exit::Failed("boom".to_string()));
    assert!(program.to_string().contains("always_fail_str0: db 98, 111, 111, 109, 0\n"));
    assert!(program.to_string().contains("\tsub rsp, 40\n\tlea rcx, [rel always_fail_str0]\n\tcall __rtfail\n\tadd rsp, 40\n"));
}

#[test]
fn test_whole_module() {
    let mut module = programs::full_module();
    module.verify().unwrap();
    PassManager::new().run(&mut module).unwrap();
    let program = compile(&module);
    assert_eq!(run(&program, "f", &[3, 4]), 14);
    assert_eq!(run(&program, "fib", &[12]), 144);
    assert_eq!(run(&program, "main", &[]), 25);
    assert_eq!(run(&program, "rect_area", &[2, 5]), 10);
}

#[test]
fn test_register_pressure_is_fatal() {
    let module = module_of(vec![programs::sum_twice()]);
    let emitter = AsmEmitter::with_allocator(&module, LinearScanAllocator::with_registers(vec![GpReg::Rcx, GpReg::Rdx]));
    let err = emitter.emit().unwrap_err();
    assert!(matches!(err, CodegenError::RegAlloc(_)), "{err:?}");
}
