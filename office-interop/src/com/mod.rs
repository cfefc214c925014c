//! Windows COM backend.

mod apartment;
mod dispatch;
mod sink;
mod variant;

pub use apartment::ApartmentGuard;
pub use dispatch::ComObject;

use tracing::info;

use crate::application::{Application, OfficeApp};
use crate::error::{InteropError, InteropResult};
use crate::worker::ApartmentFactory;

/// Starts a new instance of `app` and attaches an [`Application`] to it.
/// The calling thread must be in an apartment.
pub fn launch(app: OfficeApp) -> InteropResult<Application<ComObject>> {
    let object = ComObject::create(app.prog_id())
        .map_err(|e| InteropError::native(format!("create {}", app.prog_id()), "Application", e))?;
    Application::new(Some(object), app)
}

/// Builds Office instances for apartment workers.
#[derive(Debug, Clone, Copy)]
pub struct ComFactory {
    pub app: OfficeApp,
    pub visible: bool,
}

impl ComFactory {
    pub fn new(app: OfficeApp, visible: bool) -> Self {
        Self { app, visible }
    }
}

impl ApartmentFactory for ComFactory {
    type Native = ComObject;
    type Guard = ApartmentGuard;

    fn enter(&self) -> InteropResult<Self::Guard> {
        ApartmentGuard::new()
    }

    fn create(&self) -> InteropResult<Application<Self::Native>> {
        let application = launch(self.app)?;
        // PowerPoint refuses to hide its main window.
        if self.visible || self.app != OfficeApp::PowerPoint {
            application.set_visible(self.visible)?;
        }
        application.set_display_alerts(false)?;
        info!(app = %self.app, version = %application.version()?, "office instance started");
        Ok(application)
    }
}
