use nalgebra::Vector3;

/// Generic image type
///
/// The image is laid out in row-major order, and is indexed by a `(row,
/// column)` tuple.
///
/// ```text
///        0 ------------> width (columns, X)
///        |             |
///        |             |
///        |             |
///        V--------------
///   height (rows, Y)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Image<P> {
    data: Vec<P>,
    width: usize,
    height: usize,
}

/// Image containing the depth of each pixel
///
/// Pixels with no surface are `-inf`.
pub type DepthImage = Image<f64>;

/// Image containing a packed surface normal for each pixel
///
/// See [`pack_normal`] for the encoding; pixels with no computed normal are 0.
pub type NormalImage = Image<u32>;

impl<P: Clone> Image<P> {
    /// Builds a new image with every pixel set to `v`
    pub fn filled(width: usize, height: usize, v: P) -> Self {
        Self {
            data: vec![v; width * height],
            width,
            height,
        }
    }
}

impl<P: Clone + Default> Image<P> {
    /// Builds a new image filled with `P::default()`
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, P::default())
    }
}

impl<P> Image<P> {
    /// Returns the image width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Iterates over pixel values, in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &P> + '_ {
        self.data.iter()
    }

    /// Returns the number of pixels in the image
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks whether the image is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Generates an image by mapping a simple function over each pixel
    pub fn map<T, F: Fn(&P) -> T>(&self, f: F) -> Image<T> {
        Image {
            data: self.data.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Decomposes the image into its raw data, width, and height
    pub fn take(self) -> (Vec<P>, usize, usize) {
        (self.data, self.width, self.height)
    }

    /// Checks a `(row, column)` position
    ///
    /// Returns the input position in the 1D array if valid; panics otherwise
    fn decode_position(&self, pos: (usize, usize)) -> usize {
        let (row, col) = pos;
        assert!(
            row < self.height,
            "row ({row}) must be less than image height ({})",
            self.height
        );
        assert!(
            col < self.width,
            "column ({col}) must be less than image width ({})",
            self.width
        );
        row * self.width + col
    }
}

impl<P: Copy> Image<P> {
    /// Copies a smaller image into this one, with its top-left corner at
    /// `(row, col)`
    pub(crate) fn blit(&mut self, src: &Image<P>, row: usize, col: usize) {
        assert!(row + src.height <= self.height && col + src.width <= self.width);
        for (j, chunk) in src.data.chunks_exact(src.width.max(1)).enumerate() {
            let o = self.decode_position((row + j, col));
            self.data[o..o + src.width].copy_from_slice(chunk);
        }
    }
}

impl<'a, P: 'a> IntoIterator for &'a Image<P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;
    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// Indexes an image with `(row, col)`
impl<P> std::ops::Index<(usize, usize)> for Image<P> {
    type Output = P;
    fn index(&self, pos: (usize, usize)) -> &Self::Output {
        let index = self.decode_position(pos);
        &self.data[index]
    }
}

impl<P> std::ops::IndexMut<(usize, usize)> for Image<P> {
    fn index_mut(&mut self, pos: (usize, usize)) -> &mut Self::Output {
        let index = self.decode_position(pos);
        &mut self.data[index]
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Normal assigned to pixels at the front clipping plane
///
/// This corresponds to a normal of roughly `(0, 0, 1)`.
pub const CLIP_NORMAL: u32 = 0xffff7f7f;

/// Packs a gradient into an RGBA normal
///
/// The gradient is normalized, then each channel is mapped from `[-1, 1]` to
/// `[0, 255]`.  The result is `0xff << 24 | z << 16 | y << 8 | x`, i.e. RGBA
/// bytes in little-endian order.
///
/// The length is computed in `f64`, so tiny gradients still normalize.  A
/// zero-length gradient produces `NaN` channels, which saturate to 0.
///
/// ```
/// # use heightmap::render::pack_normal;
/// assert_eq!(pack_normal(0.0, 0.0, 2.0), 0xffff8080);
/// assert_eq!(pack_normal(-1.0, 0.0, 0.0), 0xff808000);
/// ```
pub fn pack_normal(dx: f32, dy: f32, dz: f32) -> u32 {
    let (dx, dy, dz) = (dx as f64, dy as f64, dz as f64);
    let len = (dx * dx + dy * dy + dz * dz).sqrt();
    let c = |d: f64| {
        (255.0 * (d / (2.0 * len) + 0.5)).round().clamp(0.0, 255.0) as u32
    };
    0xff << 24 | c(dz) << 16 | c(dy) << 8 | c(dx)
}

/// Unpacks a normal produced by [`pack_normal`]
///
/// Each component is only accurate to within `1 / 255`.
pub fn unpack_normal(n: u32) -> Vector3<f32> {
    let c = |shift: u32| ((n >> shift) & 0xff) as f32 / 255.0 * 2.0 - 1.0;
    Vector3::new(c(0), c(8), c(16))
}
