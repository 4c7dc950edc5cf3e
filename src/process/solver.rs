//! Fixed-step explicit integrators for the small ODE networks.

/// Number of sub-steps and the adjusted step size that exactly cover `[t0, tf]`.
fn partition(t0: f64, tf: f64, h: f64) -> (usize, f64) {
    let span = tf - t0;
    if span <= 0.0 || h <= 0.0 {
        return (0, 0.0);
    }
    let steps = (span / h).round().max(1.0) as usize;
    (steps, span / steps as f64)
}

/// Integrates `dydt` from `t0` to `tf` with forward Euler at step `h`.
pub fn euler<F>(dydt: F, t0: f64, y0: &[f64], tf: f64, h: f64) -> Vec<f64>
where
    F: Fn(f64, &[f64]) -> Vec<f64>,
{
    let (steps, h) = partition(t0, tf, h);
    let mut y = y0.to_vec();
    let mut t = t0;
    for _ in 0..steps {
        let k = dydt(t, &y);
        for (yi, ki) in y.iter_mut().zip(&k) {
            *yi += h * ki;
        }
        t += h;
    }
    y
}

/// Integrates `dydt` from `t0` to `tf` with classic fourth-order Runge-Kutta at step `h`.
pub fn runge_kutta<F>(dydt: F, t0: f64, y0: &[f64], tf: f64, h: f64) -> Vec<f64>
where
    F: Fn(f64, &[f64]) -> Vec<f64>,
{
    let (steps, h) = partition(t0, tf, h);
    let n = y0.len();
    let mut y = y0.to_vec();
    let mut t = t0;
    let mut tmp = vec![0.0; n];
    for _ in 0..steps {
        let k1 = dydt(t, &y);
        for i in 0..n {
            tmp[i] = y[i] + 0.5 * h * k1[i];
        }
        let k2 = dydt(t + 0.5 * h, &tmp);
        for i in 0..n {
            tmp[i] = y[i] + 0.5 * h * k2[i];
        }
        let k3 = dydt(t + 0.5 * h, &tmp);
        for i in 0..n {
            tmp[i] = y[i] + h * k3[i];
        }
        let k4 = dydt(t + h, &tmp);
        for i in 0..n {
            y[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        t += h;
    }
    y
}
