use elimination_stack::bits::{Align8, FlagPtr};
use rand::{rngs::ThreadRng, Rng};

#[test]
fn test_flag_ptr() {
    let mut rand = ThreadRng::default();
    let mut offers: Vec<Box<Align8<u8>>> = (0..=255u8).map(|b| Box::new(b.into())).collect();

    for _ in 1..100_000 {
        let i = rand.gen_range(0..offers.len());
        let flag = rand.gen_range(0..8usize);
        let ptr: *mut Align8<u8> = &mut *offers[i];

        let mut f = FlagPtr::default();
        f.set_ptr(ptr);
        assert_eq!(ptr, f.get_ptr());
        assert_eq!(0, f.get_flag());
        f.set_flag(flag);
        assert_eq!(flag, f.get_flag());
        assert_eq!(ptr, f.get_ptr());
        assert_eq!(i as u8, unsafe { (*f.get_ptr()).inner });
    }
}

#[test]
#[should_panic]
fn test_flag_out_of_range() {
    let mut f: FlagPtr<Align8<u8>> = FlagPtr::default();
    f.set_flag(8);
}

#[test]
fn test_boxed_offers() {
    let ptr = Align8::boxed(Some(String::from("offer")));
    assert_eq!(ptr as usize % 8, 0);
    assert_eq!(
        unsafe { Align8::unbox(ptr) },
        Some(String::from("offer"))
    );

    let ptr = Align8::<String>::boxed(None);
    assert!(ptr.is_null());
    assert_eq!(unsafe { Align8::unbox(ptr) }, None);
}
