use apsort_label::{DatasetDescriptor, LabelError, LabelFile, Split, SplitLayout};
use std::fs;
use tempfile::tempdir;

#[test]
fn images_listed_jpg_then_png_sorted() {
    let tmp = tempdir().unwrap();
    let layout = SplitLayout::new(tmp.path());
    fs::create_dir_all(layout.image_dir()).unwrap();
    fs::create_dir_all(layout.label_dir()).unwrap();
    for name in ["b.png", "c.jpg", "a.png", "a.jpg", "notes.txt"] {
        fs::write(layout.image_dir().join(name), b"x").unwrap();
    }

    layout.check().unwrap();
    let names: Vec<String> = layout
        .images()
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.jpg", "c.jpg", "a.png", "b.png"]);
}

#[test]
fn missing_labels_dir_is_reported() {
    let tmp = tempdir().unwrap();
    let layout = SplitLayout::new(tmp.path());
    fs::create_dir_all(layout.image_dir()).unwrap();
    assert!(matches!(layout.check(), Err(LabelError::MissingDir(_))));
}

#[test]
fn label_file_round_trip_through_disk() {
    let tmp = tempdir().unwrap();
    let layout = SplitLayout::new(tmp.path());
    fs::create_dir_all(layout.label_dir()).unwrap();
    let image = layout.image_dir().join("apple.jpg");
    let label = layout.label_path_for(&image);
    fs::write(&label, "0 0.5 0.5 1.0 1.0\n1 0.5 0.5\n1 0.25 0.25 0.5 0.5\n").unwrap();

    let parsed = LabelFile::read(&label).unwrap();
    assert_eq!(parsed.annotations.len(), 2);
    assert_eq!(parsed.skipped.len(), 1);

    let b = parsed.annotations[0].pixel_box(100, 100);
    assert_eq!((b.x1, b.y1, b.x2, b.y2), (0, 0, 99, 99));
}

#[test]
fn missing_label_file_is_io_error() {
    let tmp = tempdir().unwrap();
    let err = LabelFile::read(&tmp.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, LabelError::Io { .. }));
}

#[test]
fn descriptor_loads_from_disk() {
    let tmp = tempdir().unwrap();
    let yaml = tmp.path().join("data.yaml");
    fs::write(&yaml, "train: train/images\nnames: ['rottenApple', 'freshApple']\n").unwrap();

    let d = DatasetDescriptor::load(&yaml).unwrap();
    assert_eq!(d.class_names().label_for(1), "freshApple");
    assert_eq!(d.split_root(Split::Train).unwrap(), tmp.path().join("train"));
}

#[test]
fn broken_descriptor_is_descriptor_error() {
    let tmp = tempdir().unwrap();
    let yaml = tmp.path().join("data.yaml");
    fs::write(&yaml, "names: [unterminated\n").unwrap();
    assert!(matches!(
        DatasetDescriptor::load(&yaml),
        Err(LabelError::Descriptor { .. })
    ));
}
