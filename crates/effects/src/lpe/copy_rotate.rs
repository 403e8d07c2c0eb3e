//! Rotated copies of an item around an origin.
//!
//! Without `split_items` the copies are concatenated into the item's own
//! outline. With it each copy is a sibling object tracked by the
//! `lpesatellites` parameter and kept in sync on every recompute.

use livepath_document::NodeId;
use livepath_geom::{Affine, EPSILON, PathVector, Point, Vec2};
use tracing::debug;

use super::split;
use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, Parameter, PointParam, SatelliteArrayParam, ScalarParam};

#[derive(Debug)]
pub struct CopyRotate {
	common: EffectCommon,
	lpesatellites: SatelliteArrayParam,
	num_copies: ScalarParam,
	starting_angle: ScalarParam,
	rotation_angle: ScalarParam,
	gap: ScalarParam,
	origin: PointParam,
	starting_point: PointParam,
	copies_to_360: BoolParam,
	mirror_copies: BoolParam,
	split_items: BoolParam,
	link_styles: BoolParam,
}

impl Default for CopyRotate {
	fn default() -> Self {
		Self::new()
	}
}

impl CopyRotate {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new().with_clip_and_mask(),
			lpesatellites: SatelliteArrayParam::new("lpesatellites"),
			num_copies: ScalarParam::new("num_copies", 6.0).with_range(1.0, 999_999.0).integer(),
			starting_angle: ScalarParam::new("starting_angle", 0.0),
			rotation_angle: ScalarParam::new("rotation_angle", 60.0),
			gap: ScalarParam::new("gap", 0.0).with_digits(3),
			origin: PointParam::new("origin", Point::ZERO),
			starting_point: PointParam::new("starting_point", Point::new(1.0, 0.0)),
			copies_to_360: BoolParam::new("copies_to_360", true),
			mirror_copies: BoolParam::new("mirror_copies", false),
			split_items: BoolParam::new("split_items", false),
			link_styles: BoolParam::new("link_styles", false),
		}
	}

	pub fn num_copies(&self) -> usize {
		self.num_copies.get_usize().max(1)
	}

	pub fn rotation_angle(&self) -> f64 {
		self.rotation_angle.get()
	}

	pub fn origin(&self) -> Point {
		self.origin.get()
	}

	pub fn satellites(&self) -> &SatelliteArrayParam {
		&self.lpesatellites
	}

	/// Placement of copy `index` relative to the untouched input.
	///
	/// Mirrored copies reflect across the starting line and rotate one
	/// extra step, so neighbours meet edge to edge.
	pub fn copy_transform(&self, index: usize) -> Affine {
		let origin = self.origin.get().to_vec2();
		let about = |a: Affine| Affine::translate(origin) * a * Affine::translate(-origin);
		let step = self.rotation_angle.get();
		let mirrored = self.mirror_copies.get() && index % 2 == 1;
		let turns = if mirrored { index + 1 } else { index };
		let mut placed = about(Affine::rotate((step * turns as f64).to_radians()));
		if mirrored {
			let line = self.starting_angle.get().to_radians();
			let reflect = Affine::rotate(line) * Affine::scale_non_uniform(1.0, -1.0) * Affine::rotate(-line);
			placed = placed * about(reflect);
		}
		let gap = self.gap.get();
		if gap.abs() > EPSILON {
			let dir = (self.starting_angle.get() + step * index as f64).to_radians();
			placed = Affine::translate(Vec2::from_angle(dir) * gap) * placed;
		}
		placed
	}

	fn split(&self) -> bool {
		self.split_items.get()
	}

	/// Keeps the handle on the starting line at its current distance.
	fn sync_starting_point(&mut self) -> bool {
		let origin = self.origin.get();
		let distance = self.starting_point.get().distance(origin);
		if distance < EPSILON {
			return false;
		}
		let dir = Vec2::from_angle(self.starting_angle.get().to_radians());
		let point = origin + dir * distance;
		if point.distance(self.starting_point.get()) < EPSILON {
			return false;
		}
		self.starting_point.set(point);
		true
	}

	/// Creates copy `index` as a plain sibling of the item.
	fn create_copy(&mut self, cx: &mut EffectContext<'_>, after: NodeId, index: usize) -> Result<NodeId> {
		let copy = split::create_copy(cx, after)?;
		let id = cx.doc.id(copy).unwrap_or_default().to_string();
		self.lpesatellites.set_id(index, &id);
		debug!(%id, index, "created rotated copy");
		Ok(copy)
	}

	fn copies(&self) -> Vec<NodeId> {
		(0..self.lpesatellites.len())
			.filter_map(|i| self.lpesatellites.target(i))
			.collect()
	}
}

impl Effect for CopyRotate {
	fn key(&self) -> &'static str {
		"copy_rotate"
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
			&self.num_copies,
			&self.starting_angle,
			&self.rotation_angle,
			&self.gap,
			&self.origin,
			&self.starting_point,
			&self.copies_to_360,
			&self.mirror_copies,
			&self.split_items,
			&self.link_styles,
		]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.lpesatellites,
			&mut self.num_copies,
			&mut self.starting_angle,
			&mut self.rotation_angle,
			&mut self.gap,
			&mut self.origin,
			&mut self.starting_point,
			&mut self.copies_to_360,
			&mut self.mirror_copies,
			&mut self.split_items,
			&mut self.link_styles,
		]
	}

	fn on_apply(&mut self, cx: &mut EffectContext<'_>, input: &PathVector) -> Result<()> {
		let Some(bbox) = cx.input_bbox.or_else(|| input.bounding_box()) else {
			return Ok(());
		};
		let origin = Point::new(bbox.x0, bbox.center().y);
		self.origin.set(origin);
		let reach = (bbox.width() / 2.0).max(1.0);
		let dir = Vec2::from_angle(self.starting_angle.get().to_radians());
		self.starting_point.set(origin + dir * reach);
		cx.write_param(&self.origin)?;
		cx.write_param(&self.starting_point)
	}

	fn on_before_effect(&mut self, cx: &mut EffectContext<'_>, _input: &PathVector) -> Result<()> {
		let copies = self.num_copies();
		if self.copies_to_360.get() && copies > 2 {
			let step = 360.0 / copies as f64;
			if (self.rotation_angle.get() - step).abs() > EPSILON {
				self.rotation_angle.set(step);
				cx.write_param(&self.rotation_angle)?;
			}
		}
		if self.sync_starting_point() {
			cx.write_param(&self.starting_point)?;
		}

		if !self.split() {
			if !self.lpesatellites.is_empty() {
				for copy in self.copies() {
					cx.doc.delete(copy)?;
				}
				self.lpesatellites.clear();
				cx.write_param(&self.lpesatellites)?;
			}
			return Ok(());
		}
		for index in copies - 1..self.lpesatellites.len() {
			if let Some(copy) = self.lpesatellites.target(index) {
				split::set_hidden(cx, copy, true)?;
			}
		}
		Ok(())
	}

	fn do_effect(&mut self, input: &PathVector, _cx: &EffectContext<'_>) -> Result<PathVector> {
		if self.split() {
			return Ok(input.transformed(self.copy_transform(0)));
		}
		let mut out = PathVector::new();
		for index in 0..self.num_copies() {
			out.extend_from(&input.transformed(self.copy_transform(index)));
		}
		Ok(out)
	}

	fn on_after_effect(&mut self, cx: &mut EffectContext<'_>, _output: &PathVector) -> Result<()> {
		if !self.split() {
			return Ok(());
		}
		let before = self.lpesatellites.write();
		let base = cx.doc.transform(cx.item);
		let undo_source = self.copy_transform(0).inverse();
		let mut after = cx.item;
		for index in 1..self.num_copies() {
			let placement = base * self.copy_transform(index) * undo_source;
			let slot = index - 1;
			let existing = self.lpesatellites.target(slot).filter(|c| cx.doc.is_attached(*c));
			let copy = match existing {
				Some(copy) if split::sync_copy(cx, copy, placement, self.link_styles.get())? => copy,
				stale => {
					if let Some(copy) = stale {
						cx.doc.delete(copy)?;
					}
					let copy = self.create_copy(cx, after, slot)?;
					split::sync_copy(cx, copy, placement, self.link_styles.get())?;
					copy
				}
			};
			after = copy;
		}
		if self.lpesatellites.write() != before {
			cx.write_param(&self.lpesatellites)?;
		}
		Ok(())
	}

	fn on_remove(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		let keep = self.common.keep_paths;
		for copy in self.copies() {
			if keep {
				split::set_hidden(cx, copy, false)?;
			} else {
				cx.doc.delete(copy)?;
			}
		}
		if !keep {
			self.lpesatellites.clear();
		}
		Ok(())
	}

	fn on_visibility_toggled(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		let hidden = !self.common.is_visible.get();
		let copies = self.copies();
		for (index, copy) in copies.into_iter().enumerate() {
			split::set_hidden(cx, copy, hidden || index + 1 >= self.num_copies())?;
		}
		Ok(())
	}
}
