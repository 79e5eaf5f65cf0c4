use sable_engine::analysis::environment::ConstantState;
use sable_engine::analysis::fixpoint::{Fixpoint, FixpointIterator};
use sable_engine::analysis::generic::AbstractDomain;
use sable_engine::analysis::sign::Interval;
use sable_engine::analysis::transform::Transform;
use sable_engine::analysis::ConstPropConfig;
use sable_engine::ir::asm::parse_method;
use sable_engine::ir::bridge::function::Function;
use sable_engine::ir::bridge::value::Register;

fn parse(text: &str) -> Function {
    let method = parse_method("test", text).expect("unable to parse the method");
    Function::convert(&method).expect("unable to validate the method")
}

fn propagate(function: &mut Function, config: ConstPropConfig) {
    let fixpoint = FixpointIterator::new(&function.body, config)
        .run(ConstantState::top())
        .expect("fixpoint failure");
    Transform::new(config)
        .apply(&fixpoint, function)
        .expect("transform failure");
}

fn do_const_prop(text: &str, config: ConstPropConfig) -> Function {
    let mut function = parse(text);
    propagate(&mut function, config);
    function
}

fn assert_same(actual: &Function, expected: &Function) {
    assert!(
        actual.body == expected.body,
        "optimized body differs from expectation\n--- obtained ---\n{}--- expected ---\n{}",
        actual,
        expected
    );
}

fn run_fixpoint(text: &str) -> (Function, Fixpoint) {
    let function = parse(text);
    let fixpoint = FixpointIterator::new(&function.body, ConstPropConfig::default())
        .run(ConstantState::top())
        .expect("fixpoint failure");
    (function, fixpoint)
}

#[test]
fn if_to_goto() {
    let actual = do_const_prop(
        r"
        const v0 0
        if-eqz v0 :if-true-label
        const v0 1
        :if-true-label
        const v0 2
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        const v0 0
        goto :if-true-label
        const v0 1
        :if-true-label
        const v0 2
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn conditional_constant_equals_always_true() {
    let actual = do_const_prop(
        r"
        const v0 0
        const v1 0
        if-eqz v0 :if-true-label-1
        const v1 1 ; the preceding branch always jumps, so this is unreachable
        :if-true-label-1
        if-eqz v1 :if-true-label-2 ; therefore this is always true
        const v1 2
        :if-true-label-2
        return-void
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        const v0 0
        const v1 0
        goto :if-true-label-1
        const v1 1
        :if-true-label-1
        goto :if-true-label-2
        const v1 2
        :if-true-label-2
        return-void
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn conditional_constant_equals_always_false() {
    let actual = do_const_prop(
        r"
        const v0 1
        const v1 1
        if-eqz v0 :if-true-label-1
        const v1 0 ; the preceding branch never jumps, so this always runs
        :if-true-label-1
        if-eqz v1 :if-true-label-2 ; therefore this is always true
        const v1 2
        :if-true-label-2
        return-void
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        const v0 1
        const v1 1
        goto :fall
        :fall
        const v1 0
        :if-true-label-1
        goto :if-true-label-2
        const v1 2
        :if-true-label-2
        return-void
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn conditional_constant_less_than_always_true() {
    let actual = do_const_prop(
        r"
        const v0 0
        const v1 1
        if-lt v0 v1 :if-true-label-1
        const v1 0 ; the preceding branch always jumps, so this never runs
        :if-true-label-1
        if-eqz v1 :if-true-label-2 ; therefore this is never true
        const v1 2
        :if-true-label-2
        return-void
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        const v0 0
        const v1 1
        goto :if-true-label-1
        const v1 0
        :if-true-label-1
        goto :fall
        :fall
        const v1 2
        :if-true-label-2
        return-void
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn conditional_constant_infer_zero() {
    let actual = do_const_prop(
        r"
        load-param v0 ; some unknown value
        if-nez v0 :exit
        if-eqz v0 :exit ; v0 must be zero here, so this is always true
        const v0 1
        :exit
        return-void
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        load-param v0
        if-nez v0 :exit
        goto :exit
        const v0 1
        :exit
        return-void
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn conditional_constant_infer_interval() {
    let actual = do_const_prop(
        r"
        load-param v0 ; some unknown value
        if-lez v0 :exit
        if-gtz v0 :exit ; v0 must be positive here, so this is always true
        const v0 1
        :exit
        return-void
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        load-param v0
        if-lez v0 :exit
        goto :exit
        const v0 1
        :exit
        return-void
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn jump_to_immediate_next_is_left_alone() {
    let program = r"
        load-param v0
        if-eqz v0 :next ; both arms land on the next block, so the test
                        ; cannot pin v0 down in either of them
        :next
        if-eqz v0 :end
        const v0 1
        :end
        return-void
        ";
    let actual = do_const_prop(program, ConstPropConfig::default());
    let expected = parse(program);
    assert_same(&actual, &expected);
}

#[test]
fn fold_arithmetic_add_lit() {
    let config = ConstPropConfig {
        fold_arithmetic: true,
        ..Default::default()
    };
    let actual = do_const_prop(
        r"
        const v0 2147483646
        add-int/lit8 v0 v0 1 ; folds into a constant load
        const v1 2147483647
        if-eq v0 v1 :end
        const v0 2147483647
        add-int/lit8 v0 v0 1 ; overflow is not modeled, left unchanged
        :end
        return-void
        ",
        config,
    );
    let expected = parse(
        r"
        const v0 2147483646
        const v0 2147483647
        const v1 2147483647
        goto :end
        const v0 2147483647
        add-int/lit8 v0 v0 1
        :end
        return-void
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn fold_arithmetic_leaves_reachable_overflow_unchanged() {
    let config = ConstPropConfig {
        fold_arithmetic: true,
        ..Default::default()
    };
    let program = r"
        const v0 2147483647
        add-int/lit8 v0 v0 1
        return-void
        ";
    let actual = do_const_prop(program, config);
    let expected = parse(program);
    assert_same(&actual, &expected);
}

#[test]
fn analyze_cmp() {
    let actual = do_const_prop(
        r"
        load-param v0
        if-eqz v0 :b1 ; keep all three comparisons reachable
        if-gez v0 :b2
        const-wide v0 0
        const-wide v1 1
        cmp-long v2 v0 v1
        const v3 -1
        if-eq v2 v3 :end
        :b1
        const-wide v0 1
        const-wide v1 1
        cmp-long v2 v0 v1
        const v3 0
        if-eq v2 v3 :end
        :b2
        const-wide v0 1
        const-wide v1 0
        cmp-long v2 v0 v1
        const v3 1
        if-eq v2 v3 :end
        :end
        return v2
        ",
        ConstPropConfig::default(),
    );
    let expected = parse(
        r"
        load-param v0
        if-eqz v0 :b1
        if-gez v0 :b2
        const-wide v0 0
        const-wide v1 1
        const v2 -1
        const v3 -1
        goto :end
        :b1
        const-wide v0 1
        const-wide v1 1
        const v2 0
        const v3 0
        goto :end
        :b2
        const-wide v0 1
        const-wide v1 0
        const v2 1
        const v3 1
        goto :end
        :end
        return v2
        ",
    );
    assert_same(&actual, &expected);
}

#[test]
fn white_box_branch_merge() {
    let (function, fixpoint) = run_fixpoint(
        r"
        load-param v0
        const v1 0
        const v2 1
        move v3 v1
        if-eqz v0 :if-true-label
        const v2 0
        if-gez v0 :if-true-label
        :if-true-label
        return-void
        ",
    );
    let exit_label = function.body.exit_label().expect("no unique exit block");
    let exit_state = fixpoint.exit_state_at(&function.body, &exit_label);

    assert!(exit_state.get_reg(Register::from(0)).is_top());
    assert_eq!(exit_state.get_reg(Register::from(1)).get_constant(), Some(0));
    // v2 can hold either 0 or 1
    let merged = exit_state.get_reg(Register::from(2));
    assert_eq!(merged.get_constant(), None);
    assert_eq!(merged.interval(), Interval::Gez);
    assert_eq!(exit_state.get_reg(Register::from(3)).get_constant(), Some(0));
}

#[test]
fn white_box_loop_exit_refinement() {
    let (function, fixpoint) = run_fixpoint(
        r"
        load-param v0
        :loop
        const v1 0
        if-gez v0 :if-true-label
        goto :loop
        ; reaching the exit means v0 >= 0
        :if-true-label
        return-void
        ",
    );
    let exit_label = function.body.exit_label().expect("no unique exit block");
    let exit_state = fixpoint.exit_state_at(&function.body, &exit_label);

    assert_eq!(exit_state.get_reg(Register::from(0)).interval(), Interval::Gez);
    assert_eq!(exit_state.get_reg(Register::from(1)).get_constant(), Some(0));
}
