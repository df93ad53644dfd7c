use bitvec::prelude::*;

use super::error::DecodeError;
use super::tree::TreeNode;
use super::Region;

/// Tag of a node that is followed by its four sections.
pub const TAG_INTERNAL: u8 = 0;
/// Tag of a node that is followed by its red, green and blue bytes.
pub const TAG_LEAF: u8 = 1;

/// Container magic, followed by the version byte.
pub const QTA_MAGIC: &[u8; 5] = b"QuArt";
pub const QTA_VERSION: u8 = 1;
/// Flag bit: the payload is zlib-compressed.
pub const QTA_DEFLATED: u8 = 1;

const QTA_HEADER_LEN: usize = 5 + 1 + 1 + 4 + 4;

/// Bit vector used for the packed encoding.
type QuadtreeEncodeBitVec = BitVec<u8, Msb0>;

/// Region of the `index`th section, refusing to split a region that has a
/// side of one pixel.
fn section_region(region: &Region, index: usize) -> Result<Region, DecodeError> {
	if region.width() < 2 || region.height() < 2 {
		return Err(DecodeError::DegenerateRegion);
	}
	Ok(region.quadrants()[index])
}

impl TreeNode {
	/// Writes the tree as one tag byte per node in pre-order.
	///
	/// Internal nodes are `0` followed by their four sections; leaves are
	/// `1` followed by three color bytes. The stream holds no dimensions,
	/// since regions follow from the image bounds.
	pub fn encode_stream(&self, buffer: &mut Vec<u8>) {
		match &self.sections {
			Some(sections) => {
				buffer.push(TAG_INTERNAL);
				for section in sections.iter() {
					section.encode_stream(buffer);
				}
			}
			None => {
				buffer.push(TAG_LEAF);
				buffer.extend_from_slice(&self.color);
			}
		}
	}

	pub fn to_stream(&self) -> Vec<u8> {
		let mut buffer = Vec::new();
		self.encode_stream(&mut buffer);
		buffer
	}

	/// Parses one node, and its sections, starting at `curr_ind`.
	///
	/// Successful return value is the node and the index just past it.
	/// The stream only stores leaf colors, so internal nodes get the
	/// area-weighted mean of their sections.
	pub fn decode_stream(
		buffer: &[u8],
		region: Region,
		depth: u32,
		curr_ind: usize
	) -> Result<(TreeNode, usize), DecodeError> {
		let tag = *buffer.get(curr_ind).ok_or(DecodeError::InsufficientData)?;
		match tag {
			TAG_LEAF => {
				let color = buffer.get(curr_ind + 1..curr_ind + 4)
					.ok_or(DecodeError::InsufficientData)?;
				Ok((TreeNode::leaf(region, depth, [color[0], color[1], color[2]]), curr_ind + 4))
			}
			TAG_INTERNAL => {
				let section = |index, at| TreeNode::decode_stream(
					buffer,
					section_region(&region, index)?,
					depth + 1,
					at
				);
				let (tl, at) = section(0, curr_ind + 1)?;
				let (tr, at) = section(1, at)?;
				let (bl, at) = section(2, at)?;
				let (br, at) = section(3, at)?;
				Ok((TreeNode::internal(region, depth, [tl, tr, bl, br]), at))
			}
			other => Err(DecodeError::InvalidTag(other)),
		}
	}

	/// Decodes a whole byte stream for an image of the given size.
	pub fn from_stream(buffer: &[u8], width: u32, height: u32) -> Result<TreeNode, DecodeError> {
		let bounds = Region::new(0, 0, width, height).map_err(|_| DecodeError::DegenerateRegion)?;
		let (tree, end) = TreeNode::decode_stream(buffer, bounds, 0, 0)?;
		if end != buffer.len() {
			return Err(DecodeError::TrailingData(buffer.len() - end));
		}
		Ok(tree)
	}

	/// Same layout as `encode_stream` but with a single bit per tag
	/// (set for leaves) and the color packed right after it.
	///
	/// Bits are big-endian within each byte.
	pub fn encode_packed(&self, buffer: &mut QuadtreeEncodeBitVec) {
		buffer.push(self.sections.is_none());
		match &self.sections {
			Some(sections) => {
				for section in sections.iter() {
					section.encode_packed(buffer);
				}
			}
			None => {
				for byte in self.color.iter() {
					buffer.extend_from_bitslice(byte.view_bits::<Msb0>());
				}
			}
		}
	}

	pub fn to_packed(&self) -> Vec<u8> {
		let mut bits = QuadtreeEncodeBitVec::new();
		self.encode_packed(&mut bits);
		bits.into_vec()
	}

	fn decode_packed(
		bits: &BitSlice<u8, Msb0>,
		region: Region,
		depth: u32,
		mut curr_ind: usize
	) -> Result<(TreeNode, usize), DecodeError> {
		if curr_ind >= bits.len() {
			return Err(DecodeError::InsufficientData);
		}
		let is_leaf = bits[curr_ind];
		curr_ind += 1;
		if is_leaf {
			let color_bits = bits.get(curr_ind..curr_ind + 24)
				.ok_or(DecodeError::InsufficientData)?;
			let mut color = [0u8; 3];
			for (c, chunk) in color.iter_mut().zip(color_bits.chunks(8)) {
				*c = chunk.load_be::<u8>();
			}
			return Ok((TreeNode::leaf(region, depth, color), curr_ind + 24));
		}
		let section = |index, at| TreeNode::decode_packed(
			bits,
			section_region(&region, index)?,
			depth + 1,
			at
		);
		let (tl, at) = section(0, curr_ind)?;
		let (tr, at) = section(1, at)?;
		let (bl, at) = section(2, at)?;
		let (br, at) = section(3, at)?;
		Ok((TreeNode::internal(region, depth, [tl, tr, bl, br]), at))
	}

	/// Decodes the output of `to_packed` for an image of the given size.
	///
	/// Only the zero padding of the last byte may follow the tree.
	pub fn from_packed(buffer: &[u8], width: u32, height: u32) -> Result<TreeNode, DecodeError> {
		let bounds = Region::new(0, 0, width, height).map_err(|_| DecodeError::DegenerateRegion)?;
		let bits = buffer.view_bits::<Msb0>();
		let (tree, end) = TreeNode::decode_packed(bits, bounds, 0, 0)?;
		let used = (end + 7) / 8;
		if used != buffer.len() {
			return Err(DecodeError::TrailingData(buffer.len() - used));
		}
		Ok(tree)
	}

	/// Encodes the tree and its image size into a QTA container.
	///
	/// With `compress`, the packed payload is deflated with zlib framing.
	pub fn to_qta(&self, compress: bool) -> Vec<u8> {
		let mut ret = Vec::with_capacity(QTA_HEADER_LEN);
		ret.extend_from_slice(QTA_MAGIC);
		ret.push(QTA_VERSION);
		ret.push(if compress { QTA_DEFLATED } else { 0 });
		ret.extend_from_slice(&self.region.width().to_be_bytes());
		ret.extend_from_slice(&self.region.height().to_be_bytes());
		let payload = self.to_packed();
		if compress {
			ret.extend_from_slice(&miniz_oxide::deflate::compress_to_vec_zlib(&payload, 9));
		} else {
			ret.extend_from_slice(&payload);
		}
		ret
	}

	/// Reads a QTA container written by `to_qta`.
	pub fn from_qta(source: &[u8]) -> Result<TreeNode, DecodeError> {
		if source.len() < QTA_HEADER_LEN || &source[..5] != QTA_MAGIC {
			return Err(DecodeError::MissingHeader);
		}
		if source[5] != QTA_VERSION {
			return Err(DecodeError::UnsupportedVersion(source[5]));
		}
		let flags = source[6];
		let mut dim = [0u8; 4];
		dim.copy_from_slice(&source[7..11]);
		let width = u32::from_be_bytes(dim);
		dim.copy_from_slice(&source[11..15]);
		let height = u32::from_be_bytes(dim);
		let payload = &source[QTA_HEADER_LEN..];
		if flags & QTA_DEFLATED != 0 {
			let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(payload)
				.map_err(|_| DecodeError::Decompress)?;
			TreeNode::from_packed(&inflated, width, height)
		} else {
			TreeNode::from_packed(payload, width, height)
		}
	}
}
