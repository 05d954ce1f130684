use dense_storage::{Const, DenseStorage, Dyn, Dynamic, Fixed, Null, Storage};

fn main() {
    let mut m = Storage::<f64, Fixed<9>, Const<3>, Const<3>>::with_size(9, 3, 3);
    for (i, v) in m.as_mut_slice().iter_mut().enumerate() {
        *v = i as f64;
    }
    println!("fixed 3x3: {:?}", m);

    let mut bounded = Storage::<f64, Fixed<16>, Dyn, Dyn>::with_size(4, 2, 2);
    bounded.resize(12, 3, 4);
    println!("bounded: {}x{} at {:p}", bounded.rows(), bounded.cols(), bounded.data());

    let mut d = Storage::<f32, Dynamic, Dyn, Dyn>::with_size(6, 2, 3);
    d.as_mut_slice().copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    d.conservative_resize(3, 1, 3);
    d.conservative_resize(6, 3, 2);
    println!("dynamic: {:?}", d);

    let mut moved = d.take();
    println!("after take: {:?} / {:?}", d, moved);
    moved.swap(&mut d);
    println!("after swap: {:?} / {:?}", d, moved);

    let n = Storage::<f32, Null, Dyn, Const<0>>::with_size(0, 5, 0);
    println!("null: {:?} data={:p}", n, n.data());
}
