use std::fs;
use std::path::Path;

use folio_store::{File, Slot, StoreConfig, StoreError};
use folio_types::{Dictionary, IndirectObject, Name, Object, ObjectReference, Stream};
use folio_xref::{load_chain, read_section, XrefEntry};
use proptest::prelude::*;
use tempfile::TempDir;

fn name(s: &str) -> Object {
    Object::Name(Name::from(s))
}

fn r(n: u32) -> Object {
    Object::Reference(ObjectReference::number(n))
}

fn dict(entries: &[(&str, Object)]) -> Dictionary {
    entries
        .iter()
        .map(|(k, v)| (Name::from(*k), v.clone()))
        .collect()
}

fn ints(values: &[i64]) -> Object {
    Object::Array(values.iter().copied().map(Object::Integer).collect())
}

fn at(n: u32, generation: u16, object: impl Into<Object>) -> IndirectObject {
    IndirectObject::new(ObjectReference::new(n, generation), object)
}

fn annotation(rect: &[i64], contents: &[u8], open: bool) -> Dictionary {
    dict(&[
        ("Type", name("Annot")),
        ("Subtype", name("Text")),
        ("Rect", ints(rect)),
        ("Contents", Object::String(contents.to_vec())),
        ("Open", Object::Boolean(open)),
    ])
}

fn create_minimal(path: &Path, config: &StoreConfig) -> u64 {
    let mut file = File::create_with(path, config.clone()).unwrap();
    file.root = ObjectReference::number(1);

    file.add(at(
        1,
        0,
        dict(&[
            ("Type", name("Catalog")),
            ("Outlines", r(2)),
            ("Pages", r(3)),
        ]),
    ))
    .unwrap();
    file.add(at(
        2,
        0,
        dict(&[("Type", name("Outlines")), ("Count", Object::Integer(0))]),
    ))
    .unwrap();
    file.add(at(
        3,
        0,
        dict(&[
            ("Type", name("Pages")),
            ("Kids", Object::Array(vec![r(4)])),
            ("Count", Object::Integer(1)),
        ]),
    ))
    .unwrap();
    file.add(at(
        4,
        0,
        dict(&[
            ("Type", name("Page")),
            ("Parent", r(3)),
            ("MediaBox", ints(&[0, 0, 612, 792])),
            ("Contents", r(5)),
            (
                "Resources",
                Object::Dictionary(dict(&[("ProcSet", r(6))])),
            ),
        ]),
    ))
    .unwrap();
    file.add(at(
        5,
        0,
        Stream::new(dict(&[("Length", Object::Integer(0))]), Vec::new()),
    ))
    .unwrap();
    file.add(at(6, 0, Object::Array(vec![name("PDF")]))).unwrap();

    file.save().unwrap();
    let startxref = file.prev();
    file.close().unwrap();
    startxref
}

fn add_annotations(path: &Path, config: &StoreConfig) -> u64 {
    let mut file = File::open_with(path, config.clone()).unwrap();

    let page = file.get(ObjectReference::number(4));
    let mut page = page.as_dictionary().cloned().expect("page is a dictionary");
    page.insert(Name::from("Annots"), r(7));
    file.add(at(4, 0, page)).unwrap();

    file.add(at(7, 0, Object::Array(vec![r(8), r(9), r(10), r(11)])))
        .unwrap();
    file.add(at(8, 0, annotation(&[44, 616, 162, 735], b"Text #1", true)))
        .unwrap();
    file.add(at(9, 0, annotation(&[224, 668, 457, 735], b"Text #2", false)))
        .unwrap();
    file.add(at(10, 0, annotation(&[239, 393, 328, 622], b"Text #3", true)))
        .unwrap();
    file.add(at(11, 0, annotation(&[34, 398, 225, 575], b"Text #4", false)))
        .unwrap();

    file.save().unwrap();
    let startxref = file.prev();
    file.close().unwrap();
    startxref
}

fn modify_annotation(path: &Path, config: &StoreConfig) -> u64 {
    let mut file = File::open_with(path, config.clone()).unwrap();
    let mut annotation = file
        .get(ObjectReference::number(10))
        .as_dictionary()
        .cloned()
        .expect("annotation is a dictionary");
    annotation.insert(
        Name::from("Contents"),
        Object::String(b"Modified Text #3".to_vec()),
    );
    file.add(at(10, 0, annotation)).unwrap();
    file.save().unwrap();
    let startxref = file.prev();
    file.close().unwrap();
    startxref
}

fn free_annotations(path: &Path, config: &StoreConfig) -> u64 {
    let mut file = File::open_with(path, config.clone()).unwrap();
    file.add(at(7, 0, Object::Array(vec![r(10), r(11)])))
        .unwrap();
    file.free(8);
    file.free(9);
    file.save().unwrap();

    for n in [8, 9] {
        let freed = file.get(ObjectReference::number(n));
        assert!(freed.unresolved_reason().is_some_and(|u| u.is_free()));
    }
    let ten = file.get(ObjectReference::number(10));
    assert_eq!(
        ten.as_dictionary().unwrap().get(b"Contents".as_slice()),
        Some(&Object::String(b"Modified Text #3".to_vec()))
    );

    let startxref = file.prev();
    file.close().unwrap();
    startxref
}

fn reuse_freed_numbers(path: &Path, config: &StoreConfig) -> u64 {
    let mut file = File::open_with(path, config.clone()).unwrap();

    // Freed numbers now require generation 1.
    for n in [8, 9] {
        assert!(file.get(ObjectReference::number(n)).unresolved_reason().is_some_and(|u| u.is_free()));
        match file.add(at(n, 0, Object::Integer(0))) {
            Err(StoreError::GenerationTooLow { minimum, .. }) => {
                assert_eq!(minimum, ObjectReference::new(n, 1));
            }
            other => panic!("expected GenerationTooLow, got {other:?}"),
        }
    }

    let mut annotations = file
        .get(ObjectReference::number(7))
        .as_array()
        .map(<[Object]>::to_vec)
        .expect("annotations are an array");

    let eight = file
        .add(at(8, 1, annotation(&[58, 657, 172, 742], b"New Text #1", true)))
        .unwrap();
    annotations.push(Object::Reference(eight));
    let nine = file
        .add(at(9, 1, annotation(&[389, 459, 570, 537], b"New Text #2", false)))
        .unwrap();
    annotations.push(Object::Reference(nine));
    let twelve = file
        .add(at(
            12,
            0,
            annotation(
                &[44, 253, 473, 337],
                b"New Text #3\\203a longer text annotation which we will continue \\\nonto a second line",
                true,
            ),
        ))
        .unwrap();
    annotations.push(Object::Reference(twelve));
    assert_eq!(eight, ObjectReference::new(8, 1));
    assert_eq!(nine, ObjectReference::new(9, 1));

    file.add(at(7, 0, Object::Array(annotations))).unwrap();
    file.save().unwrap();
    let startxref = file.prev();
    file.close().unwrap();
    startxref
}

/// Runs the five-revision workflow and returns each revision's index offset.
fn run_workflow(path: &Path, config: &StoreConfig) -> Vec<u64> {
    vec![
        create_minimal(path, config),
        add_annotations(path, config),
        modify_annotation(path, config),
        free_annotations(path, config),
        reuse_freed_numbers(path, config),
    ]
}

fn check_final_state(path: &Path, offsets: &[u64]) {
    let bytes = fs::read(path).unwrap();

    // Every revision points at the one before it.
    for pair in offsets.windows(2) {
        let section = read_section(&bytes, pair[1]).unwrap();
        assert_eq!(section.trailer.prev, Some(pair[0]));
    }
    assert_eq!(read_section(&bytes, offsets[0]).unwrap().trailer.prev, None);

    let index = load_chain(&bytes).unwrap();
    assert_eq!(index.revisions, offsets.len());
    let highest = *index.entries.keys().next_back().unwrap();
    assert_eq!(index.trailer.size, highest + 1);
    assert_eq!(index.trailer.root, ObjectReference::number(1));
    assert!(matches!(
        index.entries[&8],
        XrefEntry::Normal { generation: 1, .. }
    ));

    let file = File::open(path).unwrap();
    let annots = file.get(ObjectReference::number(7));
    let annots = annots.as_array().unwrap();
    assert_eq!(
        annots,
        &[
            r(10),
            r(11),
            Object::Reference(ObjectReference::new(8, 1)),
            Object::Reference(ObjectReference::new(9, 1)),
            r(12),
        ]
    );
    let eight = file.get(ObjectReference::new(8, 1));
    assert_eq!(
        eight.as_dictionary().unwrap().get(b"Contents".as_slice()),
        Some(&Object::String(b"New Text #1".to_vec()))
    );
    let twelve = file.get(ObjectReference::number(12));
    assert_eq!(
        twelve.as_dictionary().unwrap().get(b"Contents".as_slice()),
        Some(&Object::String(
            b"New Text #3\\203a longer text annotation which we will continue \\\nonto a second line"
                .to_vec()
        ))
    );
    let page = file.get(ObjectReference::number(4));
    assert_eq!(page.as_dictionary().unwrap().get(b"Annots".as_slice()), Some(&r(7)));
    let contents = file.get(ObjectReference::number(5));
    assert!(contents.as_stream().unwrap().data.is_empty());
}

#[test]
fn workflow_with_xref_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("h7-minimal.pdf");
    let config = StoreConfig::default();
    let offsets = run_workflow(&path, &config);
    check_final_state(&path, &offsets);

    let bytes = fs::read(&path).unwrap();
    assert_eq!(load_chain(&bytes).unwrap().trailer.size, 13);
    assert_eq!(File::open(&path).unwrap().size(), 13);
}

#[test]
fn workflow_with_xref_streams() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("h7-minimal.pdf");
    let config = StoreConfig::xref_stream();
    let offsets = run_workflow(&path, &config);
    check_final_state(&path, &offsets);
}

#[test]
fn workflow_with_compressed_xref_streams() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("h7-minimal.pdf");
    let config = StoreConfig {
        compress_xref_stream: true,
        ..StoreConfig::xref_stream()
    };
    let offsets = run_workflow(&path, &config);
    check_final_state(&path, &offsets);
}

#[test]
fn table_file_can_continue_with_streams() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mixed.pdf");
    let first = create_minimal(&path, &StoreConfig::default());
    let second = add_annotations(&path, &StoreConfig::xref_stream());
    check_final_state_partial(&path, &[first, second]);
}

fn check_final_state_partial(path: &Path, offsets: &[u64]) {
    let bytes = fs::read(path).unwrap();
    let newest = read_section(&bytes, offsets[1]).unwrap();
    assert_eq!(newest.trailer.prev, Some(offsets[0]));
    let file = File::open(path).unwrap();
    assert_eq!(
        file.get(ObjectReference::number(7)).as_array().map(<[Object]>::len),
        Some(4)
    );
}

#[test]
fn freed_object_stays_freed_across_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("free.pdf");
    let mut file = File::create(&path).unwrap();
    let reference = file.add(Object::Integer(1)).unwrap();
    file.add(Object::Integer(2)).unwrap();
    file.free(reference.object_number);
    assert!(file.get(reference).unresolved_reason().is_some_and(|u| u.is_free()));
    file.save().unwrap();
    assert!(file.get(reference).unresolved_reason().is_some_and(|u| u.is_free()));
    file.close().unwrap();

    let file = File::open(&path).unwrap();
    assert!(file.get(reference).unresolved_reason().is_some_and(|u| u.is_free()));
    assert!(file.slot(reference.object_number).is_some_and(Slot::is_free));
    assert_eq!(file.get(ObjectReference::number(2)), Object::Integer(2));
}

fn value() -> impl Strategy<Value = Object> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Object::Boolean),
        any::<i64>().prop_map(Object::Integer),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Object::String),
        "[A-Za-z][A-Za-z0-9]{0,8}".prop_map(|s| Object::Name(Name::from(s))),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Object::Array),
            proptest::collection::btree_map("[A-Za-z]{1,5}", inner, 0..4).prop_map(|m| {
                Object::Dictionary(m.into_iter().map(|(k, v)| (Name::from(k), v)).collect())
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn added_values_read_back_after_reopen(
        values in proptest::collection::vec(value(), 1..12),
        use_stream in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roundtrip.pdf");
        let config = if use_stream { StoreConfig::xref_stream() } else { StoreConfig::default() };

        let mut file = File::create_with(&path, config).unwrap();
        let references: Vec<ObjectReference> =
            values.iter().map(|v| file.add(v.clone()).unwrap()).collect();
        file.root = references[0];
        file.save().unwrap();
        file.close().unwrap();

        let file = File::open(&path).unwrap();
        for (reference, value) in references.iter().zip(&values) {
            prop_assert_eq!(&file.get(*reference), value);
        }
    }
}
