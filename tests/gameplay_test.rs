//! A two-word adventure driven through the host input protocol
use zcore::interpreter::core::vm::VM;
use zcore::interpreter::display::HeadlessScreen;
use zcore::interpreter::utils::test_utils::{interpreter_for, ObjectSpec, StoryBuilder};
use zcore::interpreter::{Interpreter, RunState};

const TEXT: usize = 0x0C00;
const PARSE: usize = 0x0C40;
const WORDS: [&str; 2] = ["look", "quit"];

/// Dictionary addresses of `WORDS` in any story built with the same dictionary
fn dictionary_addrs(version: u8) -> Vec<u16> {
    let mut builder = StoryBuilder::new(version);
    builder.dictionary(&WORDS, b",");
    let vm = VM::new(builder.build_game().unwrap()).unwrap();
    WORDS
        .iter()
        .map(|w| vm.lookup_dictionary(w).unwrap())
        .collect()
}

fn print_bytes(builder: &StoryBuilder, text: &str) -> Vec<u8> {
    let mut bytes = vec![0xB2];
    for word in builder.encoded(text) {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}

/// Two-byte branch-on-true data reaching `target` from data at `at`
fn patch_branch(builder: &mut StoryBuilder, at: usize, target: usize) {
    let offset = target as i32 - (at as i32 + 2) + 2;
    let raw = (offset as i16 as u16) & 0x3FFF;
    builder.set_bytes(at, &[0x80 | (raw >> 8) as u8, raw as u8]);
}

fn patch_jump(builder: &mut StoryBuilder, at: usize, target: usize) {
    let offset = target as i32 - (at as i32 + 3) + 2;
    builder.set_bytes(at + 1, &(offset as i16).to_be_bytes());
}

fn build_adventure(version: u8) -> Interpreter<HeadlessScreen> {
    let addrs = dictionary_addrs(version);
    let mut b = StoryBuilder::new(version);
    b.dictionary(&WORDS, b",");
    let room = b.add_object(ObjectSpec::named("Kitchen"));
    b.set_global(0, room);
    b.set_byte(TEXT, 40).set_byte(PARSE, 4);

    let top = b.here();
    let prompt = print_bytes(&b, "> ");
    b.code(&prompt);
    // sread / aread text parse (-> G05 in v5)
    if version <= 3 {
        b.code(&[0xE4, 0x0F, 0x0C, 0x00, 0x0C, 0x40]);
    } else {
        b.code(&[0xE4, 0x0F, 0x0C, 0x00, 0x0C, 0x40, 0x15]);
    }
    // loadw parse 1 -> G03 (first word's dictionary address)
    b.code(&[0xCF, 0x1F, 0x0C, 0x40, 0x01, 0x13]);
    let [qh, ql] = addrs[1].to_be_bytes();
    let je_quit = b.code(&[0xC1, 0x8F, 0x13, qh, ql, 0, 0]);
    let [lh, ll] = addrs[0].to_be_bytes();
    let je_look = b.code(&[0xC1, 0x8F, 0x13, lh, ll, 0, 0]);

    let what = print_bytes(&b, "What?");
    b.code(&what);
    b.code(&[0xBB]);
    let jump_unknown = b.code(&[0x8C, 0, 0]);

    let look = b.here();
    let description = print_bytes(&b, "Kitchen. A lamp is here.");
    b.code(&description);
    b.code(&[0xBB]);
    // inc G02 (moves)
    b.code(&[0x95, 0x12]);
    let jump_look = b.code(&[0x8C, 0, 0]);

    let quit = b.code(&[0xBA]);

    patch_branch(&mut b, je_quit + 5, quit);
    patch_branch(&mut b, je_look + 5, look);
    patch_jump(&mut b, jump_unknown, top);
    patch_jump(&mut b, jump_look, top);
    interpreter_for(b).unwrap()
}

fn expect_line_wait(interp: &mut Interpreter<HeadlessScreen>) {
    let state = interp.run().unwrap();
    assert!(matches!(state, RunState::WaitingForLine(_)), "{state:?}");
}

#[test_log::test]
fn test_v3_session() {
    let mut interp = build_adventure(3);
    expect_line_wait(&mut interp);
    assert_eq!(interp.screen.take_output(), "> ");
    assert_eq!(interp.screen.status(), Some("Kitchen 0/0"));

    interp.provide_line("LOOK").unwrap();
    expect_line_wait(&mut interp);
    assert_eq!(interp.screen.take_output(), "Kitchen. A lamp is here.\n> ");
    assert_eq!(interp.screen.status(), Some("Kitchen 0/1"));

    interp.provide_line("dance").unwrap();
    expect_line_wait(&mut interp);
    assert_eq!(interp.screen.take_output(), "What?\n> ");

    interp.provide_line("quit").unwrap();
    assert_eq!(interp.run().unwrap(), RunState::Quit);
    assert_eq!(interp.screen.take_output(), "");
}

#[test_log::test]
fn test_v5_session_stores_terminator() {
    let mut interp = build_adventure(5);
    expect_line_wait(&mut interp);
    assert_eq!(interp.screen.status(), None);

    interp.provide_line("look").unwrap();
    expect_line_wait(&mut interp);
    assert_eq!(interp.vm.read_global(0x15).unwrap(), 13);
    // v5 text buffer: length byte, then the lowercased characters
    assert_eq!(interp.vm.read_byte(TEXT as u32 + 1).unwrap(), 4);
    assert_eq!(interp.vm.read_byte(TEXT as u32 + 2).unwrap(), b'l');

    interp.provide_line("quit").unwrap();
    assert_eq!(interp.run().unwrap(), RunState::Quit);
}

#[test_log::test]
fn test_input_outside_a_read_is_rejected() {
    let mut interp = build_adventure(3);
    assert!(interp.provide_line("look").is_err());
    assert!(interp.provide_char('y').is_err());
}
