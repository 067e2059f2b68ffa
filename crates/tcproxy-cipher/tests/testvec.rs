use cipher::StreamCipher as _;
use hex_literal::hex;
use rand::{Rng, RngCore};
use tcproxy_cipher::{CipherConfig, CipherKind, Key, Rc4, StreamCipher, XorCipher};

fn key(k: &[u8]) -> Key {
    Key::new(k).unwrap()
}

#[test]
fn tv_rc4() {
    // Well-known RC4 vectors (key, plaintext, ciphertext).
    let vectors: [(&[u8], &[u8], &[u8]); 3] = [
        (b"Key", b"Plaintext", &hex!("BBF316E8D940AF0AD3")),
        (b"Wiki", b"pedia", &hex!("1021BF0420")),
        (
            b"Secret",
            b"Attack at dawn",
            &hex!("45A01F645FC35B383552544B9BF5"),
        ),
    ];

    for (k, pt, ct) in vectors.iter() {
        let mut cipher = Rc4::new(&key(k));
        let mut data = pt.to_vec();
        cipher.apply_keystream(&mut data[..]);
        assert_eq!(&data[..], *ct);

        // And a fresh instance undoes it.
        let mut cipher = Rc4::new(&key(k));
        cipher.apply_keystream(&mut data[..]);
        assert_eq!(&data[..], *pt);
    }
}

#[test]
fn tv_xor() {
    let mut cipher = XorCipher::new(&key(&hex!("01ff")));
    let mut data = hex!("00 00 f0 f0 0f");
    cipher.apply_keystream(&mut data[..]);
    assert_eq!(data, hex!("01 ff f1 0f 0e"));
}

#[test]
fn involution() {
    let mut rng = rand::thread_rng();
    for kind in [CipherKind::Xor, CipherKind::Rc4].iter() {
        for _ in 0..16 {
            let klen = rng.gen_range(1..40);
            let mut k = vec![0_u8; klen];
            rng.fill_bytes(&mut k[..]);
            let cfg = CipherConfig::new(*kind, Some(key(&k)));

            let mut orig = vec![0_u8; rng.gen_range(0..3000)];
            rng.fill_bytes(&mut orig[..]);

            let mut data = orig.clone();
            cfg.instance().transform(&mut data[..]);
            if orig.len() > 64 {
                assert_ne!(data, orig);
            }
            cfg.instance().transform(&mut data[..]);
            assert_eq!(data, orig);
        }
    }
}

#[test]
fn rc4_determinism() {
    let k = key(b"determinism");
    let mut a = StreamCipher::new(CipherKind::Rc4, Some(&k));
    let mut b = StreamCipher::new(CipherKind::Rc4, Some(&k));
    for len in [1_usize, 7, 256, 8192, 3].iter() {
        let mut d1 = vec![0x5a_u8; *len];
        let mut d2 = d1.clone();
        a.transform(&mut d1[..]);
        b.transform(&mut d2[..]);
        assert_eq!(d1, d2);
    }
}

#[test]
fn chunking_does_not_matter() {
    // However we split the input, the output is the same: the keystream
    // only depends on how many bytes came before.
    let mut rng = rand::thread_rng();
    let mut orig = vec![0_u8; 20_000];
    rng.fill_bytes(&mut orig[..]);

    for kind in [CipherKind::Xor, CipherKind::Rc4].iter() {
        let cfg = CipherConfig::new(*kind, Some(key(b"chunky key")));

        let mut whole = orig.clone();
        cfg.instance().transform(&mut whole[..]);

        let mut pieces = orig.clone();
        let mut c = cfg.instance();
        let mut pos = 0;
        while pos < pieces.len() {
            let n = std::cmp::min(rng.gen_range(1..9000), pieces.len() - pos);
            c.transform(&mut pieces[pos..pos + n]);
            pos += n;
        }
        assert_eq!(whole, pieces);
    }
}
