use basalt::uci;

fn main() {
    std::process::exit(uci::run());
}
