//! Configuration files and their effect on a running story
use std::fs;
use zcore::config::Config;
use zcore::interpreter::core::vm::VM;
use zcore::interpreter::display::HeadlessScreen;
use zcore::interpreter::quetzal::MemorySaveStore;
use zcore::interpreter::utils::test_utils::StoryBuilder;
use zcore::interpreter::{Interpreter, RunState};

fn interpreter(builder: StoryBuilder, config: Config) -> Interpreter<HeadlessScreen> {
    let vm = VM::new(builder.build_game().unwrap()).unwrap();
    Interpreter::new(vm, HeadlessScreen::new(), Box::new(MemorySaveStore::new()), config)
}

/// random 100 -> G00..G04
fn dice_story() -> StoryBuilder {
    let mut b = StoryBuilder::new(5);
    for global in 0x10..0x15u8 {
        b.code(&[0xE7, 0x7F, 0x64, global]);
    }
    b.code(&[0xBA]);
    b
}

fn rolls(interp: &Interpreter<HeadlessScreen>) -> Vec<u16> {
    (0x10..0x15u8)
        .map(|g| interp.vm.read_global(g).unwrap())
        .collect()
}

#[test_log::test]
fn test_config_file_sets_header() {
    let path = std::env::temp_dir().join(format!("zcore-config-{}.toml", std::process::id()));
    fs::write(
        &path,
        "screen_width = 100\nscreen_height = 40\ninterpreter_number = 3\ninterpreter_version = 'B'\n",
    )
    .unwrap();
    let config = Config::load(Some(&path)).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(config.undo_slots, 5);

    let mut b = StoryBuilder::new(5);
    b.code(&[0xBA]);
    let interp = interpreter(b, config);
    let memory = &interp.vm.game.memory;
    assert_eq!(memory[0x1E], 3);
    assert_eq!(memory[0x1F], b'B');
    assert_eq!(memory[0x20], 40);
    assert_eq!(memory[0x21], 100);
    assert_eq!(&memory[0x22..0x26], &[0, 100, 0, 40]);
}

#[test_log::test]
fn test_bad_config_is_reported() {
    assert!(Config::from_toml_str("undo_slots = \"many\"").is_err());
    assert!(Config::from_toml_str("colour_scheme = 1").is_err());
    let missing = std::env::temp_dir().join("zcore-no-such-config.toml");
    assert!(Config::load(Some(&missing)).is_err());
}

#[test_log::test]
fn test_seed_makes_rolls_reproducible() {
    let seeded = Config {
        random_seed: Some(99),
        ..Config::default()
    };
    let mut first = interpreter(dice_story(), seeded.clone());
    let mut second = interpreter(dice_story(), seeded);
    assert_eq!(first.run().unwrap(), RunState::Quit);
    assert_eq!(second.run().unwrap(), RunState::Quit);
    assert_eq!(rolls(&first), rolls(&second));
    assert!(rolls(&first).iter().all(|&r| (1..=100).contains(&r)));
}
