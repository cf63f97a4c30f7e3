/// Example answering ATT Exchange MTU requests on the fixed ATT channel
///
/// Usage: att_mtu_exchange [connection handle, hex]
use rustyblue_l2cap::l2cap::constants::*;
use rustyblue_l2cap::*;
use std::sync::{Arc, Mutex};

const ATT_OP_MTU_REQ: u8 = 0x02;
const ATT_OP_MTU_RSP: u8 = 0x03;
const LOCAL_ATT_MTU: u16 = 247;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ATT MTU Exchange Example");
    println!("------------------------");

    let conn_handle = match std::env::args().nth(1) {
        Some(arg) => u16::from_str_radix(arg.trim_start_matches("0x"), 16)?,
        None => 0x0040,
    };

    let transport = match HciAclTransport::open(0, conn_handle) {
        Ok(transport) => {
            println!("Successfully opened HCI socket");
            transport
        }
        Err(err) => {
            eprintln!("Failed to open HCI socket: {}", err);
            eprintln!("Note: This example requires root/sudo privileges");
            return Err(err.into());
        }
    };

    let mut manager = L2capManager::new(L2capConfig::default(), transport)?;
    let mbufs = MbufPool::new(32, 256)?;
    let mut conn = HsConn::new(conn_handle);

    // Peer MTUs received by the handler, answered from the main loop
    let pending = Arc::new(Mutex::new(Vec::new()));
    let requests = pending.clone();

    let att_mtu = manager.config().att_mtu;
    let att = manager.create_fixed_channel(&mut conn, L2CAP_CID_ATT, att_mtu, move |_conn, chan| {
        let Some(om) = chan.rx_buf() else {
            return Ok(());
        };
        let pdu = om.to_vec();
        if pdu.len() == 3 && pdu[0] == ATT_OP_MTU_REQ {
            let peer_mtu = u16::from_le_bytes([pdu[1], pdu[2]]);
            println!("Exchange MTU request: peer MTU {}", peer_mtu);
            requests.lock().unwrap().push(peer_mtu);
        } else {
            println!("ATT PDU: {:02X?}", pdu);
        }
        Ok(())
    })?;
    manager
        .channel_mut(att)
        .ok_or("ATT channel vanished")?
        .set_my_mtu(LOCAL_ATT_MTU);

    println!("Listening for ACL data on connection 0x{:03X}", conn_handle);
    loop {
        let packet = manager.transport().socket().read_acl_packet()?;
        let om = mbufs.from_slice(&packet)?;

        match manager.rx_acl(&conn, om) {
            Ok(()) => {}
            Err(err) if err.is_peer_triggered() => println!("Dropped packet: {}", err),
            Err(err) => return Err(err.into()),
        }

        let answered: Vec<u16> = pending.lock().unwrap().drain(..).collect();
        for peer_mtu in answered {
            let mut rsp = vec![ATT_OP_MTU_RSP];
            rsp.extend_from_slice(&LOCAL_ATT_MTU.to_le_bytes());
            manager.transmit(att, mbufs.from_slice(&rsp)?)?;

            if let Some(chan) = manager.channel_mut(att) {
                chan.set_peer_mtu(peer_mtu.max(chan.default_mtu()));
                chan.mark_mtu_exchanged();
                println!("Effective ATT MTU: {}", chan.effective_mtu());
            }
        }
    }
}
