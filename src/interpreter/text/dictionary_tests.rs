use crate::interpreter::core::vm::VM;
use crate::interpreter::text::dictionary::Dictionary;
use crate::interpreter::text::text::ZText;
use crate::interpreter::utils::test_utils::{StoryBuilder, DICTIONARY_ADDR, SCRATCH_ADDR};

const WORDS: [&str; 9] = [
    "north", "south", "lamp", "take", "drop", "inventory", "look", "x", "brass",
];

fn vm_with_words(version: u8) -> VM {
    let mut builder = StoryBuilder::new(version);
    builder.dictionary(&WORDS, b".,\"");
    VM::new(builder.build_game().unwrap()).unwrap()
}

fn encode(vm: &VM, word: &str) -> Vec<u16> {
    ZText::new(&vm.game.memory, &vm.game.header).encode_word(word)
}

#[test]
fn test_binary_and_linear_agree() {
    for version in [3, 5] {
        let vm = vm_with_words(version);
        let dictionary = Dictionary::load(&vm, DICTIONARY_ADDR as u32).unwrap();
        assert_eq!(dictionary.separators, b".,\"".to_vec());
        assert_eq!(dictionary.entry_count as usize, WORDS.len());

        for word in WORDS {
            let encoded = encode(&vm, word);
            let found = dictionary.lookup_binary(&vm, &encoded).unwrap();
            assert_ne!(found, 0, "v{version} '{word}'");
            assert_eq!(dictionary.lookup_linear(&vm, &encoded).unwrap(), found);
        }
        for word in ["xyzzy", "a", "zzzzzz"] {
            let encoded = encode(&vm, word);
            assert_eq!(dictionary.lookup_binary(&vm, &encoded).unwrap(), 0);
            assert_eq!(dictionary.lookup_linear(&vm, &encoded).unwrap(), 0);
        }
    }
}

/// Distinct three-letter words "waa", "wab", ... in generation order
fn generated_words(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let first = (b'a' + (i / 26) as u8) as char;
            let second = (b'a' + (i % 26) as u8) as char;
            format!("w{first}{second}")
        })
        .collect()
}

#[test]
fn test_binary_and_linear_agree_for_every_size() {
    for version in [3, 5] {
        for size in [0, 1, 2, 3, 200] {
            let words = generated_words(size);
            let refs: Vec<&str> = words.iter().map(String::as_str).collect();
            let mut builder = StoryBuilder::new(version);
            builder.dictionary(&refs, b",");
            let vm = VM::new(builder.build_game().unwrap()).unwrap();
            let dictionary = Dictionary::load(&vm, DICTIONARY_ADDR as u32).unwrap();
            assert_eq!(dictionary.entry_count as usize, size, "v{version}");

            for word in &words {
                let encoded = encode(&vm, word);
                let found = dictionary.lookup_binary(&vm, &encoded).unwrap();
                assert_ne!(found, 0, "v{version} size {size} '{word}'");
                assert_eq!(dictionary.lookup_linear(&vm, &encoded).unwrap(), found);
            }
            // before the first entry, between entries and past the last
            for word in ["a", "waaa", "wzz", "zzzzzz"] {
                let encoded = encode(&vm, word);
                let found = dictionary.lookup_binary(&vm, &encoded).unwrap();
                assert_eq!(found, 0, "v{version} size {size} '{word}'");
                assert_eq!(dictionary.lookup_linear(&vm, &encoded).unwrap(), 0);
            }
        }
    }
}

#[test]
fn test_words_truncate_to_dictionary_resolution() {
    // six z-characters in v3, nine in v5
    let vm = vm_with_words(3);
    assert_eq!(
        vm.lookup_dictionary("inventory").unwrap(),
        vm.lookup_dictionary("invent").unwrap()
    );
    let vm = vm_with_words(5);
    assert_ne!(vm.lookup_dictionary("inventory").unwrap(), 0);
    assert_eq!(vm.lookup_dictionary("invent").unwrap(), 0);
}

#[test]
fn test_unsorted_user_dictionary() {
    let mut vm = vm_with_words(5);
    let user = SCRATCH_ADDR as u32 + 0x100;
    let words = [encode(&vm, "zebra"), encode(&vm, "apple")];
    // no separators, 6-byte entries, count -2 (unsorted)
    vm.write_byte(user, 0).unwrap();
    vm.write_byte(user + 1, 6).unwrap();
    vm.write_word(user + 2, (-2i16) as u16).unwrap();
    for (i, encoded) in words.iter().enumerate() {
        for (j, w) in encoded.iter().enumerate() {
            vm.write_word(user + 4 + 6 * i as u32 + 2 * j as u32, *w).unwrap();
        }
    }

    let dictionary = Dictionary::load(&vm, user).unwrap();
    assert_eq!(dictionary.lookup_linear(&vm, &words[1]).unwrap(), (user + 10) as u16);
    // binary search gives up on a negative count
    assert_eq!(dictionary.lookup_binary(&vm, &words[1]).unwrap(), 0);

    // text buffer "apple zebra" tokenised against it, skipping unknown words
    let text = SCRATCH_ADDR as u32;
    let parse = text + 0x40;
    vm.write_byte(text, 20).unwrap();
    vm.write_byte(text + 1, 11).unwrap();
    for (i, ch) in b"apple zebra".iter().enumerate() {
        vm.write_byte(text + 2 + i as u32, *ch).unwrap();
    }
    vm.write_byte(parse, 4).unwrap();
    vm.tokenise(text, parse, Some(user), true).unwrap();
    assert_eq!(vm.read_byte(parse + 1).unwrap(), 2);
    assert_eq!(vm.read_word(parse + 2).unwrap(), (user + 10) as u16);
    assert_eq!(vm.read_byte(parse + 5).unwrap(), 2);
    assert_eq!(vm.read_word(parse + 6).unwrap(), (user + 4) as u16);
    assert_eq!(vm.read_byte(parse + 9).unwrap(), 8);
}

#[test]
fn test_parse_buffer_limit_and_separators() {
    let mut vm = vm_with_words(3);
    let text = SCRATCH_ADDR as u32;
    let parse = text + 0x40;
    vm.write_byte(text, 30).unwrap();
    for (i, ch) in b"take lamp,north south".iter().enumerate() {
        vm.write_byte(text + 1 + i as u32, *ch).unwrap();
    }
    // room for three words only
    vm.write_byte(parse, 3).unwrap();
    vm.tokenise(text, parse, None, false).unwrap();

    assert_eq!(vm.read_byte(parse + 1).unwrap(), 3);
    let comma = vm.read_word(parse + 10).unwrap();
    assert_eq!(comma, 0);
    assert_eq!(vm.read_byte(parse + 12).unwrap(), 1);
    assert_eq!(vm.read_byte(parse + 13).unwrap(), 10);
    assert_eq!(vm.read_word(parse + 2).unwrap(), vm.lookup_dictionary("take").unwrap());
}

#[test]
fn test_positions_past_255_are_clamped() {
    // "take", 250 spaces, then "x" at offset 254 of a full v5 text buffer
    let mut vm = vm_with_words(5);
    let text = SCRATCH_ADDR as u32;
    let parse = text + 0x120;
    let mut typed = b"take".to_vec();
    typed.resize(254, b' ');
    typed.push(b'x');
    vm.write_byte(text, 255).unwrap();
    vm.write_byte(text + 1, typed.len() as u8).unwrap();
    for (i, ch) in typed.iter().enumerate() {
        vm.write_byte(text + 2 + i as u32, *ch).unwrap();
    }
    vm.write_byte(parse, 4).unwrap();
    vm.tokenise(text, parse, None, false).unwrap();

    assert_eq!(vm.read_byte(parse + 1).unwrap(), 2);
    assert_eq!(vm.read_byte(parse + 5).unwrap(), 2);
    assert_eq!(vm.read_word(parse + 6).unwrap(), vm.lookup_dictionary("x").unwrap());
    assert_eq!(vm.read_byte(parse + 9).unwrap(), 255);
}
