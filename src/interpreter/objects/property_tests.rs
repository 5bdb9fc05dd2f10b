use crate::interpreter::core::vm::VM;
use crate::interpreter::objects::zobject::ZObjectSystem;
use crate::interpreter::utils::test_utils::{ObjectSpec, StoryBuilder};

fn vm_with(version: u8, setup: impl FnOnce(&mut StoryBuilder)) -> VM {
    let mut builder = StoryBuilder::new(version);
    setup(&mut builder);
    VM::new(builder.build_game().unwrap()).unwrap()
}

#[test]
fn test_get_prop_sizes_and_default() {
    for version in [3, 5] {
        let vm = vm_with(version, |b| {
            b.property_default(9, 0x0BAD);
            b.add_object(
                ObjectSpec::named("box")
                    .prop(4, &[0x12])
                    .prop(5, &[0x34, 0x56])
                    .prop(6, &[0x01, 0x02, 0x03, 0x04]),
            );
        });
        assert_eq!(vm.get_property(1, 4).unwrap(), 0x12, "v{version}");
        assert_eq!(vm.get_property(1, 5).unwrap(), 0x3456, "v{version}");
        // longer than a word: first word, with a warning
        assert_eq!(vm.get_property(1, 6).unwrap(), 0x0102, "v{version}");
        assert_eq!(vm.get_property(1, 9).unwrap(), 0x0BAD, "v{version}");
        assert!(vm.get_property(1, 0).is_err());
    }
}

#[test]
fn test_property_walk_is_descending() {
    let vm = vm_with(3, |b| {
        b.add_object(ObjectSpec::named("box").prop(2, &[1]).prop(7, &[1, 2]).prop(4, &[0]));
    });
    assert_eq!(vm.get_next_property(1, 0).unwrap(), 7);
    assert_eq!(vm.get_next_property(1, 7).unwrap(), 4);
    assert_eq!(vm.get_next_property(1, 4).unwrap(), 2);
    assert_eq!(vm.get_next_property(1, 2).unwrap(), 0);
    let err = vm.get_next_property(1, 5).unwrap_err();
    assert!(err.contains("object 1") && err.contains("property 5"), "{err}");
}

#[test]
fn test_prop_addr_and_len() {
    for version in [3, 5] {
        let vm = vm_with(version, |b| {
            b.add_object(
                ObjectSpec::named("box")
                    .prop(3, &[9])
                    .prop(8, &[1, 2])
                    .prop(10, &[0; 6]),
            );
        });
        for (prop, len) in [(3, 1), (8, 2), (10, 6)] {
            let addr = vm.get_property_addr(1, prop).unwrap();
            assert_ne!(addr, 0);
            assert_eq!(vm.get_property_len(addr).unwrap(), len, "v{version} prop {prop}");
        }
        assert_eq!(vm.get_property_addr(1, 11).unwrap(), 0);
        assert_eq!(vm.get_property_len(0).unwrap(), 0);
    }
}

#[test]
fn test_put_prop_byte_and_word() {
    let mut vm = vm_with(5, |b| {
        b.add_object(ObjectSpec::named("box").prop(3, &[9]).prop(8, &[1, 2]));
    });
    vm.put_property(1, 3, 0x1234).unwrap();
    vm.put_property(1, 8, 0x5678).unwrap();
    assert_eq!(vm.get_property(1, 3).unwrap(), 0x34);
    assert_eq!(vm.get_property(1, 8).unwrap(), 0x5678);
}

#[test]
fn test_attributes_per_layout() {
    for (version, top) in [(3u8, 31u16), (5, 47)] {
        let mut vm = vm_with(version, |b| {
            b.add_object(ObjectSpec::named("lamp").attr(0).attr(top));
        });
        assert!(vm.test_attribute(1, 0).unwrap());
        assert!(vm.test_attribute(1, top).unwrap());
        assert!(!vm.test_attribute(1, 1).unwrap());
        vm.set_attribute(1, 1, true).unwrap();
        vm.set_attribute(1, 0, false).unwrap();
        assert!(vm.test_attribute(1, 1).unwrap());
        assert!(!vm.test_attribute(1, 0).unwrap());
        // past the last attribute reads as clear
        assert!(!vm.test_attribute(1, top + 1).unwrap());
    }
}
