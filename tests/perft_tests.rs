//! Move generator validation against the standard perft references.

use basalt::Position;

fn perft(fen: &str, depth: u32) -> u64 {
    Position::from_fen(fen).unwrap().perft(depth)
}

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const POSITION_4: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
const POSITION_5: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
const POSITION_6: &str =
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

#[test]
fn startpos_depth_4() {
    assert_eq!(perft(STARTPOS, 4), 197_281);
}

#[test]
fn startpos_depth_5() {
    assert_eq!(perft(STARTPOS, 5), 4_865_609);
}

#[test]
fn kiwipete_depth_3() {
    assert_eq!(perft(KIWIPETE, 3), 97_862);
}

#[test]
fn kiwipete_depth_4() {
    assert_eq!(perft(KIWIPETE, 4), 4_085_603);
}

#[test]
fn position_3_depth_4() {
    assert_eq!(perft(POSITION_3, 4), 43_238);
}

#[test]
fn position_4_depth_4() {
    assert_eq!(perft(POSITION_4, 4), 422_333);
}

#[test]
fn position_5_depth_4() {
    assert_eq!(perft(POSITION_5, 4), 2_103_487);
}

#[test]
fn position_6_depth_4() {
    assert_eq!(perft(POSITION_6, 4), 3_894_594);
}

#[test]
fn perft_zero_is_one() {
    assert_eq!(perft(STARTPOS, 0), 1);
}
