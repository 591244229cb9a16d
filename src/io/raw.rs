/// Read / write numeric arrays as raw little-endian binary, one array per file

use std::fs::File;
use std::io::{Write, Read, BufWriter, BufReader};
use std::path::Path;

use crate::image::{Image, ImageLayout};

/// Element types which can be stored in raw files
pub trait RawElement: Copy {
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;
    fn to_le(self) -> Self::Bytes;
    fn from_le(bytes: Self::Bytes) -> Self;
}

macro_rules! raw_element {
    ($($t:ty),*) => {$(
        impl RawElement for $t {
            type Bytes = [u8; std::mem::size_of::<$t>()];
            fn to_le(self) -> Self::Bytes { self.to_le_bytes() }
            fn from_le(bytes: Self::Bytes) -> Self { <$t>::from_le_bytes(bytes) }
        }
    )*}
}

raw_element!(f32, f64, u32);

pub fn write<T: RawElement>(data: impl IntoIterator<Item = T>, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    for datum in data {
        buf.write_all(datum.to_le().as_ref())?;
    }
    buf.flush()
}

type IORes<T> = std::io::Result<T>;

/// Lazily read the elements of a raw file. A trailing partial element is
/// ignored.
pub fn read<'a, T: RawElement + 'a>(path: &Path) -> IORes<impl Iterator<Item = IORes<T>> + 'a> {
    let file = File::open(path)?;
    let mut buf = BufReader::new(file);

    Ok(std::iter::from_fn(move || {
        use std::io::ErrorKind::UnexpectedEof;
        let mut bytes = T::Bytes::default();
        match buf.read_exact(bytes.as_mut()) {
            Ok(()) => Some(Ok(T::from_le(bytes))),
            Err(e) if e.kind() == UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

pub fn read_vec<T: RawElement>(path: &Path) -> IORes<Vec<T>> {
    read(path)?.collect()
}

impl Image {

    pub fn from_raw_file(path: &Path, layout: ImageLayout) -> IORes<Self> {
        let data: Vec<f64> = read_vec(path)?;
        let len = data.len();
        Image::new(layout, data.into()).map_err(|_| std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} holds {len} pixels, expected {} ({}x{})",
                    path.display(), layout.n_pixels(), layout.nx, layout.ny)))
    }

    pub fn write_to_raw_file(&self, path: &Path) -> IORes<()> {
        write(self.data.iter().copied(), path)
    }
}
