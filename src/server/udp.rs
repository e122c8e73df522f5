//! Blocking UDP request loop.
//!
//! Each datagram is handled to completion, solve included, before the next
//! one is read. Replies go back to the sender's address.

use anyhow::Context;
use log::{debug, error, info, warn};
use std::io;
use std::net::{SocketAddr, UdpSocket};

use super::protocol::{self, Request};
use crate::bridge::BridgeContext;
use crate::engine::{EngineError, SceneEngine};

/// Receive buffer size; requests are short text lines.
const RECV_BUFFER_SIZE: usize = 1024;

/// What the loop should do after handling one datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Reply(String),
    /// Nothing to send (the request was dropped).
    Silent,
    Shutdown,
}

/// Handle one decoded datagram against the bridge state.
///
/// Malformed or unknown requests are logged and produce no reply. Only solver
/// failures are returned as errors.
pub fn handle_datagram<E: SceneEngine>(ctx: &mut BridgeContext<E>, message: &str) -> Result<Dispatch, EngineError> {
    let request = match Request::parse(message) {
        Ok(request) => request,
        Err(err) => {
            warn!("{}", err);
            return Ok(Dispatch::Silent);
        }
    };
    debug!("Handling {:?}", request);

    let reply = match request {
        Request::LocationUpdate { id, pose } => {
            ctx.update_pose(id, pose);
            protocol::location_confirm(id)
        }
        Request::PathGain { source, target } => protocol::path_gain_done(ctx.path_loss(source, target)?),
        Request::Delay { source, target } => protocol::delay_done(ctx.delay(source, target)?),
        Request::LineOfSight { source, target } => protocol::los_done(&ctx.line_of_sight(source, target)?),
        Request::Shutdown => return Ok(Dispatch::Shutdown),
    };
    Ok(Dispatch::Reply(reply))
}

/// The bridge bound to its socket.
pub struct BridgeServer<E: SceneEngine> {
    socket: UdpSocket,
    context: BridgeContext<E>,
}

impl<E: SceneEngine> BridgeServer<E> {
    pub fn bind(address: &str, context: BridgeContext<E>) -> io::Result<Self> {
        let socket = UdpSocket::bind(address)?;
        Ok(Self::from_socket(socket, context))
    }

    pub fn from_socket(socket: UdpSocket, context: BridgeContext<E>) -> Self {
        Self { socket, context }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve requests until a shutdown request arrives.
    ///
    /// # Returns
    ///
    /// `Ok(())` on shutdown. Socket receive errors and solver failures end
    /// the loop with an error.
    pub fn run(mut self) -> anyhow::Result<()> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).context("Receiving from UDP socket")?;
            let message = match std::str::from_utf8(&buf[..n]) {
                Ok(message) => message,
                Err(err) => {
                    warn!("Dropping non UTF-8 datagram from {}: {}", peer, err);
                    continue;
                }
            };
            debug!("Received {:?} from {}", message, peer);

            match handle_datagram(&mut self.context, message).context("Propagation solve failed")? {
                Dispatch::Reply(reply) => {
                    if let Err(err) = self.socket.send_to(reply.as_bytes(), peer) {
                        error!("Failed to send {:?} to {}: {}", reply, peer, err);
                    }
                }
                Dispatch::Silent => {}
                Dispatch::Shutdown => {
                    info!("Got {} message. Bye!", protocol::SHUTDOWN);
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::engine::scripted::ScriptedEngine;
    use crate::engine::{RawPath, SolveOutput, Vec3};
    use num_complex::Complex64;
    use std::time::Duration;

    fn scripted_engine() -> ScriptedEngine {
        let mut engine = ScriptedEngine::new().with_object("car_1").with_object("car_2");
        engine.output = SolveOutput {
            sources: vec![Vec3::new(0.0, 0.0, 1.5)],
            targets: vec![Vec3::new(50.0, 0.0, 1.5)],
            paths: vec![RawPath {
                source: 0,
                target: 0,
                coefficient: Complex64::new(0.001, 0.0),
                delay: 50.0 / crate::engine::types::SPEED_OF_LIGHT,
                interactions: vec![],
            }],
        };
        engine
    }

    fn scripted_context() -> BridgeContext<ScriptedEngine> {
        BridgeContext::new(scripted_engine(), &BridgeConfig::default())
    }

    fn reply_value(reply: &str, prefix: &str) -> f64 {
        reply.strip_prefix(prefix).unwrap().parse().unwrap()
    }

    #[test]
    fn requests_map_to_replies() {
        let mut ctx = scripted_context();

        assert_eq!(handle_datagram(&mut ctx, "LOC_UPDATE:veh1,0,0,0,0,0,0,0").unwrap(), Dispatch::Reply("LOC_CONFIRM:veh1".into()));
        assert_eq!(handle_datagram(&mut ctx, "LOC_UPDATE:veh2,50,0,0,0,0,0,0").unwrap(), Dispatch::Reply("LOC_CONFIRM:veh2".into()));

        let Dispatch::Reply(reply) = handle_datagram(&mut ctx, "CALC_REQUEST_PATHGAIN:veh1,veh2").unwrap() else {
            panic!("path gain request must be answered");
        };
        assert!((reply_value(&reply, "CALC_DONE_PATHGAIN:") - 60.0).abs() < 1e-9);
        assert_eq!(handle_datagram(&mut ctx, "CALC_REQUEST_LOS:veh1,veh2").unwrap(), Dispatch::Reply("CALC_DONE_LOS:[True]".into()));
        assert_eq!(handle_datagram(&mut ctx, "CALC_REQUEST_DELAY:0,veh2").unwrap(), Dispatch::Reply("CALC_DONE_DELAY:0".into()));
        assert_eq!(ctx.engine().solve_calls, 1);
    }

    #[test]
    fn malformed_requests_are_silent() {
        let mut ctx = scripted_context();
        assert_eq!(handle_datagram(&mut ctx, "LOC_UPDATE:veh1,0,0").unwrap(), Dispatch::Silent);
        assert_eq!(handle_datagram(&mut ctx, "LOC_UPDATE:veh1,NaN,0,0,0,0,0,0").unwrap(), Dispatch::Silent);
        assert_eq!(handle_datagram(&mut ctx, "PING").unwrap(), Dispatch::Silent);
        assert_eq!(handle_datagram(&mut ctx, "SHUTDOWN_SIONNA").unwrap(), Dispatch::Shutdown);
        assert!(ctx.ledger().reported(crate::bridge::EntityId(1)).is_none());
    }

    #[test]
    fn solver_failure_is_returned() {
        let mut engine = scripted_engine();
        engine.fail_solve = true;
        let mut ctx = BridgeContext::new(engine, &BridgeConfig::default());
        handle_datagram(&mut ctx, "LOC_UPDATE:veh1,0,0,0,0,0,0,0").unwrap();
        handle_datagram(&mut ctx, "LOC_UPDATE:veh2,50,0,0,0,0,0,0").unwrap();
        assert!(handle_datagram(&mut ctx, "CALC_REQUEST_PATHGAIN:veh1,veh2").is_err());
    }

    #[test]
    fn loopback_session() {
        let server = BridgeServer::bind("127.0.0.1:0", scripted_context()).unwrap();
        let address = server.local_addr().unwrap();
        let handle = std::thread::spawn(move || server.run());

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let mut exchange = |request: &str| -> String {
            client.send_to(request.as_bytes(), address).unwrap();
            let (n, _) = client.recv_from(&mut buf).unwrap();
            String::from_utf8(buf[..n].to_vec()).unwrap()
        };

        assert_eq!(exchange("LOC_UPDATE:veh1,0,0,0,0,0,0,0"), "LOC_CONFIRM:veh1");
        assert_eq!(exchange("LOC_UPDATE:veh2,50,0,0,90,0,0,0"), "LOC_CONFIRM:veh2");
        assert!((reply_value(&exchange("CALC_REQUEST_PATHGAIN:veh1,veh2"), "CALC_DONE_PATHGAIN:") - 60.0).abs() < 1e-9);
        assert_eq!(exchange("CALC_REQUEST_PATHGAIN:veh2,veh1"), "CALC_DONE_PATHGAIN:300");
        assert_eq!(exchange("CALC_REQUEST_LOS:veh1,0"), "CALC_DONE_LOS:0");

        client.send_to(b"SHUTDOWN_SIONNA", address).unwrap();
        assert!(handle.join().unwrap().is_ok());
    }
}
