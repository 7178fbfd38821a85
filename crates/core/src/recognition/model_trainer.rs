use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::recognition::data_folder::{image_files, DataFolder};
use crate::recognition::domain::face_classifier::FaceClassifier;
use crate::recognition::domain::face_sample::canonical_sample;
use crate::recognition::domain::label_catalog::LabelCatalog;
use crate::recognition::domain::recognition_model::RecognitionModel;
use crate::shared::imaging::normalize;
use crate::video::domain::image_reader::ImageReader;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("cannot read data folder {path}: {source}")]
    DataFolder {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no person folders found in {0}")]
    NoIdentities(PathBuf),
    #[error("no usable face samples found")]
    NoSamples,
    #[error("classifier training failed: {0}")]
    Classifier(String),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Samples and labels gathered from a data folder.
pub struct TrainingSet {
    pub catalog: LabelCatalog,
    pub samples: Vec<GrayImage>,
    pub labels: Vec<u32>,
}

/// Builds a recognition model from a folder of per-person photo folders.
///
/// Every immediate subfolder of the data folder is one identity, named
/// after the folder. Folders are visited in name order so the same data
/// always yields the same labels. Each photo contributes at most one
/// sample: the first face the detector finds in it.
pub struct ModelTrainer {
    detector: Box<dyn FaceDetector>,
    reader: Box<dyn ImageReader>,
    min_face_size: u32,
}

impl ModelTrainer {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        reader: Box<dyn ImageReader>,
        min_face_size: u32,
    ) -> Self {
        Self {
            detector,
            reader,
            min_face_size,
        }
    }

    /// Scans `root` for samples. Unreadable photos and photos without a
    /// face are skipped. Persons without any sample still get a label.
    pub fn collect(&mut self, root: &Path) -> Result<TrainingSet, TrainingError> {
        let persons = DataFolder::new(root)
            .persons()
            .map_err(|source| TrainingError::DataFolder {
                path: root.to_path_buf(),
                source,
            })?;
        if persons.is_empty() {
            return Err(TrainingError::NoIdentities(root.to_path_buf()));
        }

        let catalog = LabelCatalog::from_names(persons.iter().map(|(name, _)| name.clone()));
        let mut samples = Vec::new();
        let mut labels = Vec::new();

        for (label, (name, folder)) in persons.iter().enumerate() {
            let before = samples.len();
            for path in image_files(folder) {
                if let Some(sample) = self.sample_from(&path) {
                    samples.push(sample);
                    labels.push(label as u32);
                }
            }
            log::info!(
                "{name}: {} sample(s) (label {label})",
                samples.len() - before
            );
        }

        Ok(TrainingSet {
            catalog,
            samples,
            labels,
        })
    }

    /// Collects samples under `root` and fits `classifier` to them.
    pub fn train(
        &mut self,
        root: &Path,
        classifier: Box<dyn FaceClassifier>,
    ) -> Result<RecognitionModel, TrainingError> {
        let set = self.collect(root)?;
        Self::fit(set, classifier)
    }

    /// Fits `classifier` to a collected set. Fails without touching any
    /// artifact when the set holds no sample at all.
    pub fn fit(
        set: TrainingSet,
        mut classifier: Box<dyn FaceClassifier>,
    ) -> Result<RecognitionModel, TrainingError> {
        if set.samples.is_empty() {
            return Err(TrainingError::NoSamples);
        }

        classifier
            .train(&set.samples, &set.labels)
            .map_err(|e| TrainingError::Classifier(e.to_string()))?;
        log::info!(
            "Trained on {} samples of {} identities",
            set.samples.len(),
            set.catalog.len()
        );
        Ok(RecognitionModel::new(classifier, set.catalog))
    }

    fn sample_from(&mut self, path: &Path) -> Option<GrayImage> {
        let image = match self.reader.read_gray(path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                return None;
            }
        };
        let gray = normalize(&image);
        let faces = match self.detector.detect(&gray, self.min_face_size) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("Face detection failed on {}: {e}", path.display());
                return None;
            }
        };
        let Some(face) = faces.first() else {
            log::debug!("No face in {}", path.display());
            return None;
        };
        canonical_sample(&gray, face)
    }
}

/// Writes both model artifacts. Each file is written to a temporary
/// sibling first and renamed into place, so a reader never sees a
/// half-written artifact.
pub fn save_model(
    model: &RecognitionModel,
    model_path: &Path,
    labels_path: &Path,
) -> Result<(), TrainingError> {
    for path in [model_path, labels_path] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TrainingError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let model_tmp = temp_sibling(model_path);
    model
        .write_classifier(&model_tmp)
        .map_err(|e| TrainingError::Write {
            path: model_tmp.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;

    let labels_tmp = temp_sibling(labels_path);
    model
        .catalog()
        .save(&labels_tmp)
        .map_err(|source| TrainingError::Write {
            path: labels_tmp.clone(),
            source,
        })?;

    for (tmp, path) in [(&model_tmp, model_path), (&labels_tmp, labels_path)] {
        fs::rename(tmp, path).map_err(|source| TrainingError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    log::info!(
        "Saved model to {} and labels to {}",
        model_path.display(),
        labels_path.display()
    );
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::infrastructure::lbph_classifier::LbphClassifier;
    use crate::shared::frame::Frame;
    use crate::shared::region::Region;
    use crate::video::infrastructure::image_file_reader::ImageFileReader;

    /// Treats the whole image as one face.
    struct WholeImageDetector;

    impl FaceDetector for WholeImageDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            _min_size: u32,
        ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok(vec![Region::frame_bounds(frame.width(), frame.height())])
        }
    }

    struct NoFaceDetector;

    impl FaceDetector for NoFaceDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _min_size: u32,
        ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }
    }

    fn trainer(detector: Box<dyn FaceDetector>) -> ModelTrainer {
        ModelTrainer::new(detector, Box::new(ImageFileReader::new()), 20)
    }

    fn write_photo(path: &Path, seed: u32) {
        let img = GrayImage::from_fn(64, 64, |x, y| {
            image::Luma([((x * seed + y * 7 + seed * 13) % 256) as u8])
        });
        img.save(path).unwrap();
    }

    /// `bob/` with two photos, `alice/` with one photo, `carol/` empty.
    fn data_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["bob", "alice", "carol"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        write_photo(&dir.path().join("bob/1.png"), 3);
        write_photo(&dir.path().join("bob/2.PNG"), 5);
        write_photo(&dir.path().join("alice/a.png"), 11);
        fs::write(dir.path().join("alice/notes.txt"), "not a photo").unwrap();
        fs::write(dir.path().join("loose.png"), "ignored").unwrap();
        dir
    }

    #[test]
    fn test_collect_labels_folders_in_name_order() {
        let dir = data_folder();
        let set = trainer(Box::new(WholeImageDetector))
            .collect(dir.path())
            .unwrap();

        let names: Vec<_> = set.catalog.iter().collect();
        assert_eq!(names, vec![(0, "alice"), (1, "bob"), (2, "carol")]);
        assert_eq!(set.labels, vec![0, 1, 1]);
        assert_eq!(set.samples.len(), 3);
    }

    #[test]
    fn test_one_sampled_person_and_one_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("erin")).unwrap();
        fs::create_dir(dir.path().join("frank")).unwrap();
        for (i, seed) in [3, 5, 7].into_iter().enumerate() {
            write_photo(&dir.path().join(format!("erin/{i}.jpg")), seed);
        }

        let mut trainer = trainer(Box::new(WholeImageDetector));
        let set = trainer.collect(dir.path()).unwrap();
        assert_eq!(set.catalog.len(), 2);
        assert_eq!(set.labels, vec![0, 0, 0]);

        let model = trainer
            .train(dir.path(), Box::new(LbphClassifier::default()))
            .unwrap();
        write_photo(&dir.path().join("held_out.png"), 9);
        let photo = normalize(
            &ImageFileReader::new()
                .read_gray(&dir.path().join("held_out.png"))
                .unwrap(),
        );
        let sample =
            canonical_sample(&photo, &Region::frame_bounds(photo.width(), photo.height())).unwrap();
        assert_eq!(model.predict(&sample).unwrap().label, 0);
    }

    fn save_texture(path: &Path, texture: impl Fn(u32, u32) -> bool) {
        GrayImage::from_fn(200, 200, |x, y| image::Luma([if texture(x, y) { 200 } else { 50 }]))
            .save(path)
            .unwrap();
    }

    fn held_out_sample(path: &Path) -> GrayImage {
        let photo = normalize(&ImageFileReader::new().read_gray(path).unwrap());
        canonical_sample(&photo, &Region::frame_bounds(photo.width(), photo.height())).unwrap()
    }

    #[test]
    fn test_held_out_photos_of_two_people_are_told_apart() {
        let dir = tempfile::tempdir().unwrap();
        let stripes = |phase: u32| move |_x: u32, y: u32| ((y + phase) / 10) % 2 == 0;
        let checks = |shift: u32| move |x: u32, y: u32| (((x + shift) / 10) + ((y + shift) / 10)) % 2 == 0;

        fs::create_dir(dir.path().join("hana")).unwrap();
        fs::create_dir(dir.path().join("ivan")).unwrap();
        for phase in [0, 3, 6] {
            save_texture(&dir.path().join(format!("hana/{phase}.png")), stripes(phase));
            save_texture(&dir.path().join(format!("ivan/{phase}.png")), checks(phase));
        }
        save_texture(&dir.path().join("hana_new.png"), stripes(8));
        save_texture(&dir.path().join("ivan_new.png"), checks(8));

        let model = trainer(Box::new(WholeImageDetector))
            .train(dir.path(), Box::new(LbphClassifier::default()))
            .unwrap();

        let hana = model.predict(&held_out_sample(&dir.path().join("hana_new.png"))).unwrap();
        let ivan = model.predict(&held_out_sample(&dir.path().join("ivan_new.png"))).unwrap();
        assert_eq!(model.catalog().name(hana.label), Some("hana"));
        assert_eq!(model.catalog().name(ivan.label), Some("ivan"));
    }

    #[test]
    fn test_retraining_unchanged_data_yields_same_catalog() {
        let dir = data_folder();
        let first = trainer(Box::new(WholeImageDetector)).collect(dir.path()).unwrap();
        let second = trainer(Box::new(WholeImageDetector)).collect(dir.path()).unwrap();
        assert_eq!(first.catalog, second.catalog);
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_unreadable_photo_is_skipped() {
        let dir = data_folder();
        fs::write(dir.path().join("carol/broken.jpg"), "garbage").unwrap();
        let set = trainer(Box::new(WholeImageDetector))
            .collect(dir.path())
            .unwrap();
        assert_eq!(set.labels, vec![0, 1, 1]);
    }

    #[test]
    fn test_train_produces_model_recognizing_its_samples() {
        let dir = data_folder();
        let model = trainer(Box::new(WholeImageDetector))
            .train(dir.path(), Box::new(LbphClassifier::default()))
            .unwrap();
        assert_eq!(model.catalog().len(), 3);

        let photo = ImageFileReader::new()
            .read_gray(&dir.path().join("alice/a.png"))
            .unwrap();
        let gray = normalize(&photo);
        let sample =
            canonical_sample(&gray, &Region::frame_bounds(gray.width(), gray.height())).unwrap();
        let prediction = model.predict(&sample).unwrap();
        assert_eq!(prediction.label, 0);
        assert!(prediction.distance < 1e-6);
    }

    #[test]
    fn test_no_faces_is_an_error() {
        let dir = data_folder();
        let result = trainer(Box::new(NoFaceDetector))
            .train(dir.path(), Box::new(LbphClassifier::default()));
        assert!(matches!(result, Err(TrainingError::NoSamples)));
    }

    #[test]
    fn test_empty_data_folder_has_no_identities() {
        let dir = tempfile::tempdir().unwrap();
        let result = trainer(Box::new(WholeImageDetector)).collect(dir.path());
        assert!(matches!(result, Err(TrainingError::NoIdentities(_))));
    }

    #[test]
    fn test_missing_data_folder() {
        let result =
            trainer(Box::new(WholeImageDetector)).collect(Path::new("/nonexistent/faces"));
        assert!(matches!(result, Err(TrainingError::DataFolder { .. })));
    }

    #[test]
    fn test_saved_model_loads_back() {
        let dir = data_folder();
        let model = trainer(Box::new(WholeImageDetector))
            .train(dir.path(), Box::new(LbphClassifier::default()))
            .unwrap();

        let out = tempfile::tempdir().unwrap();
        let model_path = out.path().join("models/model.json");
        let labels_path = out.path().join("models/labels.json");
        save_model(&model, &model_path, &labels_path).unwrap();

        assert!(!temp_sibling(&model_path).exists());
        assert!(!temp_sibling(&labels_path).exists());
        let loaded =
            RecognitionModel::load(&model_path, &labels_path, Box::new(LbphClassifier::default()))
                .unwrap();
        assert_eq!(loaded.catalog(), model.catalog());
    }
}
