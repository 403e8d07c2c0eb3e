//! Reflection of an item across a mirror line.
//!
//! The mirror image is added to the item's outline, replaces it with
//! `discard_orig_path`, or lives in a sibling object tracked by
//! `lpesatellites` with `split_items`. With `fuse_paths` the outline is cut
//! at the line and each kept half is joined to its own reflection.

use livepath_document::NodeId;
use livepath_geom::{Affine, EPSILON, Line, PathVector, Point, Rect, Subpath, reflection};
use tracing::debug;

use super::split;
use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, EnumData, EnumParam, Parameter, PointParam, SatelliteArrayParam};
use crate::shape;

/// How the mirror line is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorMode {
	/// Vertical line through the page center.
	Vertical,
	/// Horizontal line through the page center.
	Horizontal,
	/// Free start and end points.
	Free,
	/// Vertical line at the center point's x.
	X,
	/// Horizontal line at the center point's y.
	Y,
}

static MODES: &[EnumData<MirrorMode>] = &[
	EnumData {
		value: MirrorMode::Vertical,
		key: "vertical",
		label: "Vertical page center",
	},
	EnumData {
		value: MirrorMode::Horizontal,
		key: "horizontal",
		label: "Horizontal page center",
	},
	EnumData {
		value: MirrorMode::Free,
		key: "free",
		label: "Freely defined mirror line",
	},
	EnumData {
		value: MirrorMode::X,
		key: "X",
		label: "X coordinate of mirror line midpoint",
	},
	EnumData {
		value: MirrorMode::Y,
		key: "Y",
		label: "Y coordinate of mirror line midpoint",
	},
];

/// Tolerance for treating a dragged center as moved, per mode.
const AXIS_NEAR: f64 = 0.01;
const FREE_NEAR: f64 = 0.001;

#[derive(Debug)]
pub struct MirrorSymmetry {
	common: EffectCommon,
	lpesatellites: SatelliteArrayParam,
	mode: EnumParam<MirrorMode>,
	discard_orig_path: BoolParam,
	fuse_paths: BoolParam,
	oposite_fuse: BoolParam,
	split_items: BoolParam,
	split_open: BoolParam,
	link_styles: BoolParam,
	start_point: PointParam,
	end_point: PointParam,
	center_point: PointParam,
	previous_center: Point,
}

impl Default for MirrorSymmetry {
	fn default() -> Self {
		Self::new()
	}
}

impl MirrorSymmetry {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new().with_clip_and_mask(),
			lpesatellites: SatelliteArrayParam::new("lpesatellites"),
			mode: EnumParam::new("mode", MODES, MirrorMode::Free),
			discard_orig_path: BoolParam::new("discard_orig_path", false),
			fuse_paths: BoolParam::new("fuse_paths", false),
			oposite_fuse: BoolParam::new("oposite_fuse", false),
			split_items: BoolParam::new("split_items", false),
			split_open: BoolParam::new("split_open", false),
			link_styles: BoolParam::new("link_styles", false),
			start_point: PointParam::new("start_point", Point::ZERO),
			end_point: PointParam::new("end_point", Point::ZERO),
			center_point: PointParam::new("center_point", Point::ZERO),
			previous_center: Point::ZERO,
		}
	}

	pub fn mode(&self) -> MirrorMode {
		self.mode.get()
	}

	/// The reflection across the current mirror line.
	pub fn mirror(&self) -> Affine {
		reflection(self.start_point.get(), self.end_point.get())
	}

	pub fn satellites(&self) -> &SatelliteArrayParam {
		&self.lpesatellites
	}

	fn split(&self) -> bool {
		self.split_items.get() && !self.discard_orig_path.get()
	}

	/// Moves the mirror line to follow the mode. `bbox` is the item's
	/// input extent, `page` the page size and `to_item` maps document
	/// coordinates into the item.
	fn place_line(&mut self, bbox: Rect, page: Option<(f64, f64)>, to_item: Affine) {
		let mode = self.mode.get();
		let center = self.center_point.get();
		let (mut a, mut b) = (Point::new(bbox.x1, bbox.y0), Point::new(bbox.x1, bbox.y1));
		match mode {
			MirrorMode::Y => {
				a = Point::new(bbox.x0, center.y);
				b = Point::new(bbox.x1, center.y);
				self.center_point.set(a.midpoint(b));
			}
			MirrorMode::X => {
				a = Point::new(center.x, bbox.y0);
				b = Point::new(center.x, bbox.y1);
				self.center_point.set(a.midpoint(b));
			}
			_ => {}
		}
		if self.start_point.get() == self.end_point.get() {
			self.start_point.set(a);
			self.end_point.set(b);
			self.center_point.set(a.midpoint(b));
			self.previous_center = self.center_point.get();
			return;
		}
		let (start, end) = (self.start_point.get(), self.end_point.get());
		match mode {
			MirrorMode::X | MirrorMode::Y => {
				if self.previous_center.distance(self.center_point.get()) > AXIS_NEAR {
					self.center_point.set(a.midpoint(b));
					self.start_point.set(a);
					self.end_point.set(b);
				} else {
					let off = |p: Point, q: Point| match mode {
						MirrorMode::X => (p.x - q.x).abs() > AXIS_NEAR,
						_ => (p.y - q.y).abs() > AXIS_NEAR,
					};
					if off(start, a) {
						self.start_point.set(a);
					}
					if off(end, b) {
						self.end_point.set(b);
					}
				}
			}
			MirrorMode::Free => {
				if self.previous_center.distance(center) > FREE_NEAR {
					let shift = center - start.midpoint(end);
					self.start_point.set(start + shift);
					self.end_point.set(end + shift);
				}
				let mid = self.start_point.get().midpoint(self.end_point.get());
				self.center_point.set(mid);
			}
			MirrorMode::Vertical | MirrorMode::Horizontal => {
				let Some((width, height)) = page else {
					debug!("no page size for a page-centered mirror line");
					return;
				};
				let (from, to) = if mode == MirrorMode::Vertical {
					(Point::new(width / 2.0, 0.0), Point::new(width / 2.0, height))
				} else {
					(Point::new(0.0, height / 2.0), Point::new(width, height / 2.0))
				};
				self.start_point.set(to_item * from);
				self.end_point.set(to_item * to);
				self.center_point.set(self.start_point.get().midpoint(self.end_point.get()));
			}
		}
		self.previous_center = self.center_point.get();
	}

	/// Which side of the line `p` lies on: 1 for the kept side, -1 for the
	/// mirrored side and 0 on the line.
	fn side(&self, divider: Line, p: Point) -> i32 {
		let cross = (divider.p1 - divider.p0).cross(p - divider.p0);
		let sign = if cross > EPSILON {
			1
		} else if cross < -EPSILON {
			-1
		} else {
			0
		};
		if self.oposite_fuse.get() { sign } else { -sign }
	}

	/// The mirror line stretched past every point of `bbox`.
	fn divider(&self, bbox: Rect) -> Line {
		let center = self.center_point.get();
		let dir = (self.end_point.get() - self.start_point.get()).normalize();
		let diagonal = bbox.width().hypot(bbox.height());
		let reach = diagonal + (center - bbox.center()).hypot();
		Line::new(center + dir * reach, center - dir * reach)
	}

	/// Cuts one subpath at the line, keeps the pieces on the kept side and,
	/// unless the item is split, closes each with its reflection.
	fn fuse(&self, sp: &Subpath, m: Affine, divider: Line, out: &mut PathVector) {
		if sp.is_empty() {
			return;
		}
		let split = self.split();
		let crossings = sp.line_crossings(divider);
		if crossings.is_empty() {
			if self.side(divider, sp.end()) == 1 {
				out.push(sp.clone());
				if !split {
					out.push(sp.transformed(m));
				}
			}
			return;
		}

		let total = sp.len() as f64;
		// Each piece with whether its start and end lie on the line.
		let mut pieces: Vec<(Subpath, bool, bool)> = crossings
			.windows(2)
			.map(|w| (sp.portion(w[0], w[1]), true, true))
			.collect();
		let (first, last) = (crossings[0], crossings[crossings.len() - 1]);
		if sp.is_closed() {
			let mut wrap = sp.portion(last, total);
			for seg in sp.portion(0.0, first).segments() {
				wrap.push(*seg);
			}
			pieces.push((wrap, true, true));
		} else {
			pieces.insert(0, (sp.portion(0.0, first), first < EPSILON, true));
			pieces.push((sp.portion(last, total), true, total - last < EPSILON));
		}

		for (piece, start_on, end_on) in pieces {
			if piece.is_empty() || piece.is_degenerate() {
				continue;
			}
			let middle = piece.point_at(piece.len() as f64 / 2.0);
			if self.side(divider, middle) != 1 {
				continue;
			}
			if split {
				let mut piece = piece;
				if sp.is_closed() && !self.split_open.get() {
					piece.close();
				}
				out.push(piece);
				continue;
			}
			let mirrored = piece.reversed().transformed(m);
			let mut joined = if end_on || !start_on {
				let mut joined = piece.clone();
				for seg in mirrored.segments() {
					joined.push(*seg);
				}
				joined
			} else {
				let mut joined = mirrored;
				for seg in piece.segments() {
					joined.push(*seg);
				}
				joined
			};
			if start_on && end_on {
				joined.close();
			}
			out.push(joined);
		}
	}

	fn copies(&self) -> Vec<NodeId> {
		(0..self.lpesatellites.len())
			.filter_map(|i| self.lpesatellites.target(i))
			.collect()
	}

	fn erase_copies(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		for copy in self.copies() {
			cx.doc.delete(copy)?;
		}
		self.lpesatellites.clear();
		cx.write_param(&self.lpesatellites)
	}
}

impl Effect for MirrorSymmetry {
	fn key(&self) -> &'static str {
		"mirror_symmetry"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![
			&self.lpesatellites,
			&self.mode,
			&self.discard_orig_path,
			&self.fuse_paths,
			&self.oposite_fuse,
			&self.split_items,
			&self.split_open,
			&self.link_styles,
			&self.start_point,
			&self.end_point,
			&self.center_point,
		]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.lpesatellites,
			&mut self.mode,
			&mut self.discard_orig_path,
			&mut self.fuse_paths,
			&mut self.oposite_fuse,
			&mut self.split_items,
			&mut self.split_open,
			&mut self.link_styles,
			&mut self.start_point,
			&mut self.end_point,
			&mut self.center_point,
		]
	}

	fn on_apply(&mut self, cx: &mut EffectContext<'_>, input: &PathVector) -> Result<()> {
		let Some(bbox) = cx.input_bbox.or_else(|| input.bounding_box()) else {
			return Ok(());
		};
		self.start_point.set(Point::new(bbox.x1, bbox.y0));
		self.end_point.set(Point::new(bbox.x1, bbox.y1));
		self.center_point.set(Point::new(bbox.x1, bbox.center().y));
		self.previous_center = self.center_point.get();
		cx.write_param(&self.start_point)?;
		cx.write_param(&self.end_point)?;
		cx.write_param(&self.center_point)
	}

	fn on_before_effect(&mut self, cx: &mut EffectContext<'_>, input: &PathVector) -> Result<()> {
		if !self.split() && !self.lpesatellites.is_empty() {
			self.erase_copies(cx)?;
		}
		let Some(bbox) = cx.input_bbox.or_else(|| input.bounding_box()) else {
			return Ok(());
		};
		let before = [self.start_point.get(), self.end_point.get(), self.center_point.get()];
		let page = shape::page_size(cx.doc);
		let to_item = cx.doc.i2doc(cx.item).inverse();
		self.place_line(bbox, page, to_item);
		let params = [&self.start_point, &self.end_point, &self.center_point];
		for (param, old) in params.into_iter().zip(before) {
			if param.get() != old {
				cx.write_param(param)?;
			}
		}
		Ok(())
	}

	fn do_effect(&mut self, input: &PathVector, cx: &EffectContext<'_>) -> Result<PathVector> {
		let fuse = self.fuse_paths.get();
		let degenerate = self.start_point.get().distance(self.end_point.get()) < EPSILON;
		if degenerate || (self.split_items.get() && !fuse) {
			return Ok(input.clone());
		}
		let m = self.mirror();
		if !fuse || self.discard_orig_path.get() {
			let mut out = if self.discard_orig_path.get() {
				PathVector::new()
			} else {
				input.clone()
			};
			out.extend_from(&input.transformed(m));
			return Ok(out);
		}
		let Some(bbox) = cx.input_bbox.or_else(|| input.bounding_box()) else {
			return Ok(input.clone());
		};
		let divider = self.divider(bbox);
		let mut out = PathVector::new();
		for sp in input.iter() {
			self.fuse(sp, m, divider, &mut out);
		}
		Ok(out)
	}

	fn on_after_effect(&mut self, cx: &mut EffectContext<'_>, _output: &PathVector) -> Result<()> {
		if !self.split() {
			return Ok(());
		}
		let before = self.lpesatellites.write();
		let placement = cx.doc.transform(cx.item) * self.mirror();
		let link_styles = self.link_styles.get();
		let existing = self.lpesatellites.target(0).filter(|c| cx.doc.is_attached(*c));
		match existing {
			Some(copy) if split::sync_copy(cx, copy, placement, link_styles)? => {}
			stale => {
				if let Some(copy) = stale {
					cx.doc.delete(copy)?;
				}
				let item = cx.item;
				let copy = split::create_copy(cx, item)?;
				let id = cx.doc.id(copy).unwrap_or_default().to_string();
				self.lpesatellites.set_id(0, &id);
				split::sync_copy(cx, copy, placement, link_styles)?;
				debug!(%id, "created mirror copy");
			}
		}
		if self.lpesatellites.write() != before {
			cx.write_param(&self.lpesatellites)?;
		}
		Ok(())
	}

	fn on_remove(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		if self.common.keep_paths {
			for copy in self.copies() {
				split::set_hidden(cx, copy, false)?;
			}
			return Ok(());
		}
		for copy in self.copies() {
			cx.doc.delete(copy)?;
		}
		self.lpesatellites.clear();
		Ok(())
	}

	fn on_visibility_toggled(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		let hidden = !self.common.is_visible.get();
		for copy in self.copies() {
			split::set_hidden(cx, copy, hidden)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use livepath_geom::parse_d;
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	fn close(a: Point, b: Point) -> bool {
		a.distance(b) < 1e-9
	}

	fn bbox() -> Rect {
		Rect::new(0.0, 0.0, 10.0, 4.0)
	}

	/// An effect mirroring across the vertical line x = 5.
	fn at_five() -> MirrorSymmetry {
		let mut effect = MirrorSymmetry::new();
		effect.start_point.set(Point::new(5.0, 0.0));
		effect.end_point.set(Point::new(5.0, 4.0));
		effect.center_point.set(Point::new(5.0, 2.0));
		effect.previous_center = Point::new(5.0, 2.0);
		effect
	}

	fn run(effect: &mut MirrorSymmetry, d: &str) -> PathVector {
		let mut doc = livepath_document::Document::new();
		let item = doc.root();
		let geometry = rustc_hash::FxHashMap::default();
		let recompute = crate::RecomputeContext::default();
		let config = crate::EngineConfig::default();
		let cx = EffectContext {
			doc: &mut doc,
			item,
			lpe_node: item,
			recompute: &recompute,
			config: &config,
			is_clip_or_mask: false,
			input_bbox: None,
			geometry: &geometry,
		};
		effect.do_effect(&parse_d(d).unwrap(), &cx).unwrap()
	}

	#[test]
	fn unplaced_line_snaps_to_the_right_edge() {
		let mut effect = MirrorSymmetry::new();
		effect.place_line(bbox(), None, Affine::IDENTITY);
		assert_eq!(effect.start_point.get(), Point::new(10.0, 0.0));
		assert_eq!(effect.end_point.get(), Point::new(10.0, 4.0));
		assert_eq!(effect.center_point.get(), Point::new(10.0, 2.0));
	}

	#[test]
	fn dragging_the_center_moves_a_free_line() {
		let mut effect = at_five();
		effect.center_point.set(Point::new(7.0, 3.0));
		effect.place_line(bbox(), None, Affine::IDENTITY);
		assert_eq!(effect.start_point.get(), Point::new(7.0, 1.0));
		assert_eq!(effect.end_point.get(), Point::new(7.0, 5.0));
		assert_eq!(effect.previous_center, Point::new(7.0, 3.0));
	}

	#[rstest]
	#[case(MirrorMode::X, Point::new(3.0, 0.0), Point::new(3.0, 4.0))]
	#[case(MirrorMode::Y, Point::new(0.0, 1.0), Point::new(10.0, 1.0))]
	fn axis_modes_span_the_bounding_box(#[case] mode: MirrorMode, #[case] start: Point, #[case] end: Point) {
		let mut effect = at_five();
		effect.mode.set(mode);
		effect.center_point.set(Point::new(3.0, 1.0));
		effect.place_line(bbox(), None, Affine::IDENTITY);
		assert_eq!(effect.start_point.get(), start);
		assert_eq!(effect.end_point.get(), end);
	}

	#[test]
	fn page_modes_use_the_page_center() {
		let mut effect = at_five();
		effect.mode.set(MirrorMode::Vertical);
		effect.place_line(bbox(), Some((100.0, 50.0)), Affine::translate((-10.0, 0.0)));
		assert_eq!(effect.start_point.get(), Point::new(40.0, 0.0));
		assert_eq!(effect.end_point.get(), Point::new(40.0, 50.0));

		effect.mode.set(MirrorMode::Horizontal);
		effect.place_line(bbox(), Some((100.0, 50.0)), Affine::IDENTITY);
		assert_eq!(effect.center_point.get(), Point::new(50.0, 25.0));
	}

	#[test]
	fn plain_mirror_keeps_the_original_first() {
		let mut effect = at_five();
		let out = run(&mut effect, "M 0,0 L 2,0 L 2,2 Z");
		assert_eq!(out.len(), 2);
		assert!(close(out.subpaths()[0].start(), Point::new(0.0, 0.0)));
		assert!(close(out.subpaths()[1].start(), Point::new(10.0, 0.0)));

		effect.discard_orig_path.set(true);
		let out = run(&mut effect, "M 0,0 L 2,0 L 2,2 Z");
		assert_eq!(out.len(), 1);
		assert!(close(out.subpaths()[0].start(), Point::new(10.0, 0.0)));
	}

	#[test]
	fn unplaced_line_passes_the_input_through() {
		let mut effect = MirrorSymmetry::new();
		effect.fuse_paths.set(true);
		assert_eq!(run(&mut effect, "M 0,0 L 2,0"), parse_d("M 0,0 L 2,0").unwrap());
	}

	#[test]
	fn split_without_fuse_passes_the_input_through() {
		let mut effect = at_five();
		effect.split_items.set(true);
		assert_eq!(run(&mut effect, "M 0,0 L 2,0"), parse_d("M 0,0 L 2,0").unwrap());
	}

	#[test]
	fn fused_rectangle_is_symmetric() {
		let mut effect = at_five();
		effect.fuse_paths.set(true);
		let out = run(&mut effect, "M 0,0 L 8,0 L 8,4 L 0,4 Z");
		assert_eq!(out.len(), 1);
		let sp = &out.subpaths()[0];
		assert!(sp.is_closed());
		let bbox = sp.bounding_box();
		assert!((bbox.x0 - 0.0).abs() < 1e-9 && (bbox.x1 - 10.0).abs() < 1e-9, "{bbox:?}");

		effect.oposite_fuse.set(true);
		let out = run(&mut effect, "M 0,0 L 8,0 L 8,4 L 0,4 Z");
		let bbox = out.subpaths()[0].bounding_box();
		assert!((bbox.x0 - 2.0).abs() < 1e-9 && (bbox.x1 - 8.0).abs() < 1e-9, "{bbox:?}");
	}

	#[test]
	fn fused_open_path_meets_its_reflection_on_the_line() {
		let mut effect = at_five();
		effect.fuse_paths.set(true);
		let out = run(&mut effect, "M 1,1 L 7,3");
		assert_eq!(out.len(), 1);
		let sp = &out.subpaths()[0];
		assert!(!sp.is_closed());
		assert!(close(sp.start(), Point::new(1.0, 1.0)));
		assert!(close(sp.end(), Point::new(9.0, 1.0)));
		assert!(close(sp.point_at(1.0), Point::new(5.0, 2.0 + 1.0 / 3.0)));
	}

	#[test]
	fn fused_split_keeps_only_the_kept_half() {
		let mut effect = at_five();
		effect.fuse_paths.set(true);
		effect.split_items.set(true);
		let out = run(&mut effect, "M 0,0 L 8,0 L 8,4 L 0,4 Z");
		assert_eq!(out.len(), 1);
		let bbox = out.subpaths()[0].bounding_box();
		assert!((bbox.x1 - 5.0).abs() < 1e-9, "{bbox:?}");
		assert!(out.subpaths()[0].is_closed());
	}
}
