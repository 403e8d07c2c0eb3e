use kurbo::{ParamCurve, PathSeg};

use crate::{PathVector, Subpath};

/// A run of segments that may jump between consecutive pieces.
///
/// Effects that need cross-subpath context receive the whole item as one
/// piecewise value; [`Piecewise::into_path_vector`] splits it again wherever
/// consecutive pieces do not meet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Piecewise {
	segments: Vec<PathSeg>,
}

impl Piecewise {
	pub fn new(segments: Vec<PathSeg>) -> Self {
		Self { segments }
	}

	pub fn from_subpath(sp: &Subpath) -> Self {
		Self::new(sp.segments().to_vec())
	}

	/// Concatenates every subpath in order.
	pub fn concat(pv: &PathVector) -> Self {
		Self::new(pv.iter().flat_map(|sp| sp.segments().iter().copied()).collect())
	}

	pub fn segments(&self) -> &[PathSeg] {
		&self.segments
	}

	pub fn segments_mut(&mut self) -> &mut Vec<PathSeg> {
		&mut self.segments
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Rebuilds subpaths, starting a new one at every gap wider than
	/// `tolerance`. A run whose end meets its start is closed when
	/// `close_joined` is set.
	pub fn into_path_vector(self, tolerance: f64, close_joined: bool) -> PathVector {
		let mut out = PathVector::new();
		let mut current: Option<Subpath> = None;
		for seg in self.segments {
			match current.as_mut() {
				Some(sp) if sp.end().distance(seg.start()) <= tolerance => sp.push(seg),
				_ => {
					if let Some(done) = current.take() {
						out.push(finish(done, tolerance, close_joined));
					}
					let mut sp = Subpath::new(seg.start());
					sp.push(seg);
					current = Some(sp);
				}
			}
		}
		if let Some(done) = current {
			out.push(finish(done, tolerance, close_joined));
		}
		out
	}
}

fn finish(mut sp: Subpath, tolerance: f64, close_joined: bool) -> Subpath {
	if close_joined && sp.len() > 1 && sp.end().distance(sp.start()) <= tolerance {
		sp.close();
	}
	sp
}
