// Kotlin/Swift binding generator
//
// cargo run -p keepalive-core --bin uniffi-bindgen -- generate \
//     --library target/release/libkeepalive_mobile.so --language kotlin --out-dir out

fn main() {
    uniffi::uniffi_bindgen_main()
}
