use crate::interpreter::core::interpreter::RunState;
use crate::interpreter::utils::test_utils::{interpreter_for, run_code, StoryBuilder};

#[test]
fn test_nested_calls_restore_stack_depth() {
    let interp = run_code(3, |b| {
        // inner: push 9 ; push 9 ; ret #5
        let [ihi, ilo] = b
            .routine(0x3100, 0, &[], &[0xE8, 0x7F, 0x09, 0xE8, 0x7F, 0x09, 0x9B, 0x05])
            .to_be_bytes();
        // outer: push 2 ; push 3 ; call inner -> sp ; ret_popped
        let outer = b.routine(
            0x3000,
            0,
            &[],
            &[0xE8, 0x7F, 0x02, 0xE8, 0x7F, 0x03, 0xE0, 0x3F, ihi, ilo, 0x00, 0xB8],
        );
        let [hi, lo] = outer.to_be_bytes();
        // push 1 ; call outer -> G00
        b.code(&[0xE8, 0x7F, 0x01]);
        b.code(&[0xE0, 0x3F, hi, lo, 0x10]);
    })
    .unwrap();
    assert_eq!(interp.vm.read_global(0x10).unwrap(), 5);
    assert_eq!(interp.vm.stack, vec![1]);
    assert_eq!(interp.vm.call_depth(), 0);
}

#[test]
fn test_local_defaults_depend_on_version() {
    // add L01 L02 -> G00 ; rtrue, called with one argument
    let body = [0x74, 0x01, 0x02, 0x10, 0xB0];
    for (version, expected) in [(3, 1 + 8), (5, 1)] {
        let interp = run_code(version, |b| {
            let [hi, lo] = b.routine(0x3000, 2, &[7, 8], &body).to_be_bytes();
            b.code(&[0xE0, 0x1F, hi, lo, 0x01, 0x00]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), expected, "v{version}");
    }
}

#[test]
fn test_call_vn_discards_result() {
    let interp = run_code(5, |b| {
        let [hi, lo] = b.routine(0x3000, 0, &[], &[0x9B, 0x2A]).to_be_bytes();
        // store G00 3 ; call_vn routine ; call_1n routine
        b.code(&[0x0D, 0x10, 0x03]);
        b.code(&[0xF9, 0x3F, hi, lo]);
        b.code(&[0x8F, hi, lo]);
    })
    .unwrap();
    assert_eq!(interp.vm.read_global(0x10).unwrap(), 3);
    assert!(interp.vm.stack.is_empty());
}

#[test]
fn test_too_many_arguments_are_dropped() {
    let interp = run_code(5, |b| {
        // one local; arguments beyond it are ignored. ret L01
        let [hi, lo] = b.routine(0x3000, 1, &[], &[0xAB, 0x01]).to_be_bytes();
        b.code(&[0xE0, 0x15, hi, lo, 0x04, 0x05, 0x06, 0x10]);
    })
    .unwrap();
    assert_eq!(interp.vm.read_global(0x10).unwrap(), 4);
}

#[test]
fn test_return_from_main_in_v6_quits() {
    let mut builder = StoryBuilder::new(6);
    // the builder's main routine body: ret #0
    builder.code(&[0x9B, 0x00]);
    let mut interp = interpreter_for(builder).unwrap();
    assert_eq!(interp.run().unwrap(), RunState::Quit);
}

#[test]
fn test_runaway_recursion_halts() {
    let mut builder = StoryBuilder::new(5);
    // routine calls itself forever
    let packed = builder.pack(0x3000);
    let [hi, lo] = packed.to_be_bytes();
    builder.routine(0x3000, 0, &[], &[0xE0, 0x3F, hi, lo, 0x00]);
    builder.code(&[0xE0, 0x3F, hi, lo, 0x00]);
    let mut interp = interpreter_for(builder).unwrap();
    assert!(interp.run().is_err());
    assert!(matches!(interp.state(), RunState::Halted(_)));
}
