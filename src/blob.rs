use crate::object_id::ObjectId;

/// A captured snapshot of one file's content.
///
/// The id covers the file name as well as the content, so two files with
/// identical bytes but different names are stored as separate objects.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Blob {
    file_name: String,
    content: Vec<u8>,
    uid: ObjectId,
}

impl Blob {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let content = content.into();
        let uid = ObjectId::of_parts([file_name.as_bytes(), content.as_slice()]);
        Blob {
            file_name,
            content,
            uid,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn uid(&self) -> ObjectId {
        self.uid
    }
}

#[test]
fn test_blob_identity() {
    let b1 = Blob::new("a.txt", "hello");
    let b2 = Blob::new("a.txt", "hello");
    assert_eq!(b1.uid(), b2.uid());
    assert_ne!(b1.uid(), Blob::new("b.txt", "hello").uid());
    assert_ne!(b1.uid(), Blob::new("a.txt", "world").uid());
    assert_eq!(b1.content(), b"hello");
    assert_eq!(b1.file_name(), "a.txt");
}
