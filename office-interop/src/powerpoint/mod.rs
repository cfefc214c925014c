//! PowerPoint object model slice.

mod presentation;

pub use presentation::{Presentation, Slide, SlideLayout};

use crate::collection::Collection;

pub type Presentations<H> = Collection<H, Presentation<H>>;
pub type Slides<H> = Collection<H, Slide<H>>;
