//! Saving to disk in one session and restoring in another
use std::fs;
use std::path::PathBuf;
use zcore::config::Config;
use zcore::interpreter::core::vm::VM;
use zcore::interpreter::display::HeadlessScreen;
use zcore::interpreter::quetzal::FileSaveStore;
use zcore::interpreter::utils::test_utils::StoryBuilder;
use zcore::interpreter::{Interpreter, RunState};

fn story() -> StoryBuilder {
    let mut b = StoryBuilder::new(5);
    // restore -> G04
    b.code(&[0xBE, 0x01, 0xFF, 0x14]);
    // store G00 5 ; save -> G01
    b.code(&[0x0D, 0x10, 0x05]);
    b.code(&[0xBE, 0x00, 0xFF, 0x11]);
    // je G01 #2 ?restored
    b.code(&[0x41, 0x11, 0x02, 0xC6]);
    // store G00 99 ; quit
    b.code(&[0x0D, 0x10, 0x63, 0xBA]);
    // restored: store G02 1 ; quit
    b.code(&[0x0D, 0x12, 0x01, 0xBA]);
    b
}

fn session(dir: &PathBuf) -> Interpreter<HeadlessScreen> {
    let vm = VM::new(story().build_game().unwrap()).unwrap();
    let config = Config {
        random_seed: Some(7),
        save_dir: dir.clone(),
        ..Config::default()
    };
    let store = FileSaveStore::new(dir.clone());
    let mut interp = Interpreter::new(vm, HeadlessScreen::new(), Box::new(store), config);
    interp.set_save_name("adventure");
    interp
}

#[test_log::test]
fn test_save_in_one_session_restore_in_the_next() {
    let dir = std::env::temp_dir().join(format!("zcore-save-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let mut first = session(&dir);
    assert_eq!(first.run().unwrap(), RunState::Quit);
    // nothing to restore yet, then a successful save
    assert_eq!(first.vm.read_global(0x14).unwrap(), 0);
    assert_eq!(first.vm.read_global(0x11).unwrap(), 1);
    assert_eq!(first.vm.read_global(0x10).unwrap(), 99);

    let bytes = fs::read(dir.join("adventure.qzl")).unwrap();
    assert_eq!(&bytes[0..4], b"FORM");
    assert_eq!(&bytes[8..12], b"IFZS");

    let mut second = session(&dir);
    assert_eq!(second.run().unwrap(), RunState::Quit);
    // resumed after the save with 2 stored, memory as it was when saved
    assert_eq!(second.vm.read_global(0x11).unwrap(), 2);
    assert_eq!(second.vm.read_global(0x10).unwrap(), 5);
    assert_eq!(second.vm.read_global(0x12).unwrap(), 1);

    fs::remove_dir_all(&dir).unwrap();
}

#[test_log::test]
fn test_save_from_another_story_is_refused() {
    let dir = std::env::temp_dir().join(format!("zcore-mismatch-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let mut first = session(&dir);
    first.run().unwrap();

    // same code, different release number
    let mut other = story();
    other.set_word(0x02, 2);
    let vm = VM::new(other.build_game().unwrap()).unwrap();
    let config = Config {
        save_dir: dir.clone(),
        ..Config::default()
    };
    let mut second = Interpreter::new(
        vm,
        HeadlessScreen::new(),
        Box::new(FileSaveStore::new(dir.clone())),
        config,
    );
    second.set_save_name("adventure");
    assert_eq!(second.run().unwrap(), RunState::Quit);
    // restore stored 0 and the story carried on from the top
    assert_eq!(second.vm.read_global(0x14).unwrap(), 0);
    assert_eq!(second.vm.read_global(0x10).unwrap(), 99);

    fs::remove_dir_all(&dir).unwrap();
}
