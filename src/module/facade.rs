//! connectivity facade
//! bridges bus callbacks into the inbound router and turns connection loss
//! into a reconnect command on the module pipeline

use std::sync::Arc;

use crate::common::buffer::CommandSender;
use crate::connectivity::ConnectivityListener;
use crate::module::ModuleCore;
use crate::router::InboundMessageRouter;
use crate::warn;

const LOG_TAG: &str = "connectivity_facade";

pub struct ConnectivityFacade {
    router: Arc<InboundMessageRouter>,
    command: CommandSender<ModuleCore>,
}

impl ConnectivityFacade {
    pub fn new(router: Arc<InboundMessageRouter>, command: CommandSender<ModuleCore>) -> Self {
        ConnectivityFacade { router, command }
    }
}

impl ConnectivityListener for ConnectivityFacade {
    fn message_received(&self, channel: &str, payload: &str) {
        self.router.dispatch(channel, payload);
    }

    fn connection_lost(&self) {
        warn!(LOG_TAG, "connection to message bus lost, scheduling reconnect");
        self.command.push(|core| core.handle_connection_lost());
    }

    fn channels(&self) -> Vec<String> {
        self.router.channels()
    }
}
